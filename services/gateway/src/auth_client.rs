//! gRPC client for the auth service.

use crate::config::UpstreamConfig;
use crate::error::ApiError;
use anyhow::{Context, Result};
use sift_protos::auth::auth_service_client::AuthServiceClient;
use sift_protos::auth::{
    LoginRequest, RefreshTokenRequest, RegisterRequest, ValidateTokenRequest,
};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, instrument, warn};

/// Deadline for per-request token validation; an unresponsive auth service
/// must not hold user requests hostage
const VALIDATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Access/refresh pair as handed back to HTTP clients
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthClient {
    client: AuthServiceClient<Channel>,
}

impl AuthClient {
    /// Create a client for the configured address. The connection is lazy so
    /// the gateway can start before the auth service is reachable.
    pub fn connect(config: &UpstreamConfig) -> Result<Self> {
        let endpoint = Endpoint::from_shared(config.service_address.clone())
            .context("Invalid auth service address")?
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs));

        let channel = endpoint.connect_lazy();

        Ok(Self {
            client: AuthServiceClient::new(channel),
        })
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<String, ApiError> {
        let resp = self
            .client
            .clone()
            .register(RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
            })
            .await
            .map_err(ApiError::from)?;

        Ok(resp.into_inner().user_id)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let resp = self
            .client
            .clone()
            .login(LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
            .map_err(ApiError::from)?;

        let resp = resp.into_inner();
        Ok(TokenPair {
            access_token: resp.token,
            refresh_token: resp.refresh_token,
        })
    }

    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let resp = self
            .client
            .clone()
            .refresh_token(RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .await
            .map_err(ApiError::from)?;

        let resp = resp.into_inner();
        Ok(TokenPair {
            access_token: resp.token,
            refresh_token: resp.refresh_token,
        })
    }

    /// Validate a bearer token under a hard 2-second deadline and return the
    /// user id it carries
    pub async fn validate_token(&self, token: &str) -> Result<String, ApiError> {
        let mut request = tonic::Request::new(ValidateTokenRequest {
            token: token.to_string(),
        });
        request.set_timeout(VALIDATE_TIMEOUT);

        let resp = self
            .client
            .clone()
            .validate_token(request)
            .await
            .map_err(|status| {
                warn!(code = ?status.code(), "Token validation failed");
                ApiError::from(status)
            })?
            .into_inner();

        if !resp.valid {
            return Err(ApiError::Unauthorized("invalid token".to_string()));
        }

        debug!(user_id = %resp.user_id, "Token validated");
        Ok(resp.user_id)
    }
}
