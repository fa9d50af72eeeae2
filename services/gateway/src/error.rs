//! HTTP error mapping for the gateway.
//!
//! Every failure surfaces as a small `{"error": "..."}` body; upstream
//! details never leak past the 500 boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<tonic::Status> for ApiError {
    fn from(status: tonic::Status) -> Self {
        let message = |fallback: &str| {
            if status.message().is_empty() {
                fallback.to_string()
            } else {
                status.message().to_string()
            }
        };

        match status.code() {
            tonic::Code::InvalidArgument => ApiError::InvalidInput(message("invalid request")),
            tonic::Code::Unauthenticated => ApiError::Unauthorized(message("unauthorized")),
            tonic::Code::NotFound => ApiError::NotFound(message("not found")),
            tonic::Code::AlreadyExists => ApiError::AlreadyExists(message("already exists")),
            _ => ApiError::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidInput("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::AlreadyExists("x".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_grpc_status_mapping() {
        let e = ApiError::from(tonic::Status::not_found("content not found"));
        assert!(matches!(e, ApiError::NotFound(ref m) if m == "content not found"));

        let e = ApiError::from(tonic::Status::already_exists("user already exists"));
        assert!(matches!(e, ApiError::AlreadyExists(_)));

        let e = ApiError::from(tonic::Status::unauthenticated("invalid credentials"));
        assert!(matches!(e, ApiError::Unauthorized(_)));

        // opaque upstream failures collapse to a generic 500
        let e = ApiError::from(tonic::Status::internal("pg: connection refused"));
        assert!(matches!(e, ApiError::Internal));
        assert_eq!(e.to_string(), "internal server error");
    }
}
