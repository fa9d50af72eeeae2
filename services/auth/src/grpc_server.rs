//! gRPC surface of the auth service.

use crate::usecase::{AuthError, AuthUsecase};
use anyhow::{Context, Result};
use sift_protos::auth::auth_service_server::{AuthService, AuthServiceServer};
use sift_protos::auth::{
    LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse, RegisterRequest,
    RegisterResponse, ValidateTokenRequest, ValidateTokenResponse,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, instrument};

fn to_status(e: AuthError) -> Status {
    match e {
        AuthError::InvalidInput(reason) => Status::invalid_argument(reason),
        AuthError::UserNotFound => Status::not_found("user not found"),
        AuthError::UserAlreadyExists => Status::already_exists("user already exists"),
        AuthError::InvalidCredentials => Status::unauthenticated("invalid credentials"),
        AuthError::InvalidToken => Status::unauthenticated("invalid token"),
        AuthError::Internal(_) => Status::internal("internal error"),
    }
}

pub struct AuthGrpc {
    usecase: Arc<AuthUsecase>,
}

impl AuthGrpc {
    pub fn new(usecase: Arc<AuthUsecase>) -> Self {
        Self { usecase }
    }
}

#[tonic::async_trait]
impl AuthService for AuthGrpc {
    #[instrument(skip(self, request))]
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();

        let user_id = self
            .usecase
            .register(&req.email, &req.password, &req.name)
            .await
            .map_err(to_status)?;

        Ok(Response::new(RegisterResponse {
            user_id: user_id.to_string(),
        }))
    }

    #[instrument(skip(self, request))]
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let pair = self
            .usecase
            .login(&req.email, &req.password)
            .await
            .map_err(to_status)?;

        Ok(Response::new(LoginResponse {
            token: pair.access_token,
            refresh_token: pair.refresh_token,
        }))
    }

    #[instrument(skip(self, request))]
    async fn validate_token(
        &self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        let req = request.into_inner();

        let user_id = self.usecase.validate_token(&req.token).map_err(to_status)?;

        Ok(Response::new(ValidateTokenResponse {
            user_id,
            valid: true,
        }))
    }

    #[instrument(skip(self, request))]
    async fn refresh_token(
        &self,
        request: Request<RefreshTokenRequest>,
    ) -> Result<Response<RefreshTokenResponse>, Status> {
        let req = request.into_inner();

        let pair = self
            .usecase
            .refresh_token(&req.refresh_token)
            .map_err(to_status)?;

        Ok(Response::new(RefreshTokenResponse {
            token: pair.access_token,
            refresh_token: pair.refresh_token,
        }))
    }
}

/// Serve the auth gRPC service until the shutdown future resolves
pub async fn serve(
    usecase: Arc<AuthUsecase>,
    port: u16,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{port}")
        .parse()
        .context("Invalid gRPC listen address")?;

    info!(address = %addr, "Starting auth gRPC server");

    tonic::transport::Server::builder()
        .add_service(AuthServiceServer::new(AuthGrpc::new(usecase)))
        .serve_with_shutdown(addr, shutdown)
        .await
        .context("gRPC server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_to_status_codes() {
        assert_eq!(
            to_status(AuthError::UserAlreadyExists).code(),
            tonic::Code::AlreadyExists
        );
        assert_eq!(
            to_status(AuthError::InvalidCredentials).code(),
            tonic::Code::Unauthenticated
        );
        assert_eq!(
            to_status(AuthError::InvalidToken).code(),
            tonic::Code::Unauthenticated
        );
        assert_eq!(
            to_status(AuthError::UserNotFound).code(),
            tonic::Code::NotFound
        );
        assert_eq!(
            to_status(AuthError::InvalidInput("x".to_string())).code(),
            tonic::Code::InvalidArgument
        );

        // internal details never leak
        let status = to_status(AuthError::Internal("secret dsn".to_string()));
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("secret"));
    }
}
