//! HS256 token issuing and validation.
//!
//! Access and refresh tokens carry the same claim shape and differ only in
//! lifetime; a refresh is a validate-then-reissue.

use crate::models::TokenPair;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs as i64),
            refresh_ttl: Duration::seconds(refresh_ttl_secs as i64),
        }
    }

    fn issue(&self, user_id: &str, ttl: Duration) -> Result<(String, i64), TokenError> {
        let now = Utc::now();
        let expires_at = (now + ttl).timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            exp: expires_at,
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok((token, expires_at))
    }

    /// Issue a fresh access/refresh pair for a user
    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair, TokenError> {
        let (access_token, access_expires_at) = self.issue(user_id, self.access_ttl)?;
        let (refresh_token, refresh_expires_at) = self.issue(user_id, self.refresh_ttl)?;

        debug!(user_id, access_expires_at, refresh_expires_at, "Tokens issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Validate a token and return the user id it was issued for
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|_| TokenError::Invalid)?;

        Ok(data.claims.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", 900, 86400)
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let signer = signer();
        let pair = signer.issue_pair("user-123").unwrap();

        assert_eq!(signer.validate(&pair.access_token).unwrap(), "user-123");
        assert_eq!(signer.validate(&pair.refresh_token).unwrap(), "user-123");
        assert!(pair.refresh_expires_at > pair.access_expires_at);
    }

    #[test]
    fn test_validate_rejects_wrong_secret() {
        let pair = signer().issue_pair("user-123").unwrap();

        let other = TokenSigner::new("other-secret", 900, 86400);
        assert!(matches!(
            other.validate(&pair.access_token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        // Zero TTL puts exp in the past relative to validation (leeway is 0)
        let now = Utc::now();
        let claims = Claims {
            user_id: "user-123".to_string(),
            exp: (now - Duration::seconds(30)).timestamp(),
            iat: (now - Duration::seconds(60)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            signer().validate(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(matches!(
            signer().validate("not-a-token"),
            Err(TokenError::Invalid)
        ));
    }
}
