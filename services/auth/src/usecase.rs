//! Credential and token lifecycle: register, login, validate, refresh.

use crate::tokens::{TokenError, TokenSigner};
use crate::user_repo::{UserRepoError, UserRepository};
use crate::models::TokenPair;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UserRepoError> for AuthError {
    fn from(e: UserRepoError) -> Self {
        match e {
            UserRepoError::NotFound => AuthError::UserNotFound,
            UserRepoError::AlreadyExists => AuthError::UserAlreadyExists,
            UserRepoError::Database(e) => AuthError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Signing(reason) => AuthError::Internal(reason),
        }
    }
}

pub struct AuthUsecase {
    users: UserRepository,
    tokens: TokenSigner,
}

impl AuthUsecase {
    pub fn new(users: UserRepository, tokens: TokenSigner) -> Self {
        Self { users, tokens }
    }

    /// Register a new user and return their id
    #[instrument(skip(self, password, name))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Uuid, AuthError> {
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidInput("invalid email".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("empty password".to_string()));
        }

        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let user_id = self.users.create(email, &hash, name).await?;

        info!(user_id = %user_id, "User registered");
        metrics::counter!("auth.users.registered").increment(1);

        Ok(user_id)
    }

    /// Verify credentials and issue a token pair
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            // Don't reveal whether the account exists
            Err(UserRepoError::NotFound) => {
                warn!("Login attempt for unknown account");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !valid {
            warn!("Invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.tokens.issue_pair(&user.id.to_string())?;

        info!(user_id = %user.id, "User authenticated");
        metrics::counter!("auth.logins").increment(1);

        Ok(pair)
    }

    /// Validate a token and return the user id it carries
    pub fn validate_token(&self, token: &str) -> Result<String, AuthError> {
        Ok(self.tokens.validate(token)?)
    }

    /// Validate a refresh token and rotate the pair
    pub fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let user_id = self.tokens.validate(refresh_token)?;
        Ok(self.tokens.issue_pair(&user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_error_mapping() {
        assert!(matches!(
            AuthError::from(UserRepoError::AlreadyExists),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            AuthError::from(UserRepoError::NotFound),
            AuthError::UserNotFound
        ));
    }

    #[test]
    fn test_token_error_mapping() {
        assert!(matches!(
            AuthError::from(TokenError::Invalid),
            AuthError::InvalidToken
        ));
    }
}
