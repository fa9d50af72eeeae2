//! Public auth endpoints, proxied to the auth service.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidInput("invalid request".to_string()));
    }

    let user_id = state
        .auth
        .register(&req.email, &req.password, &req.name)
        .await?;

    info!(user_id = %user_id, "User registered");
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

#[instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokensResponse>, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidInput("invalid request".to_string()));
    }

    let pair = state.auth.login(&req.email, &req.password).await?;

    Ok(Json(TokensResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[instrument(skip(state, req))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokensResponse>, ApiError> {
    if req.refresh_token.is_empty() {
        return Err(ApiError::InvalidInput("invalid request".to_string()));
    }

    let pair = state.auth.refresh(&req.refresh_token).await?;

    Ok(Json(TokensResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}
