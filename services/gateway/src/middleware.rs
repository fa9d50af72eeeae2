//! Request-scoped middleware: correlation ids and the auth gate.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info_span, warn, Instrument};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// User id bound by the auth gate, available to handlers as an extension
#[derive(Debug, Clone)]
pub struct UserId(pub String);

/// Correlation id for the request, honored from `X-Request-ID` or generated
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn generate_request_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

/// Attach a correlation id to the request and echo it in the response
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    request.extensions_mut().insert(RequestId(id.clone()));

    let span = info_span!("request", request_id = %id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Auth gate: every protected route requires a bearer token that the auth
/// service vouches for. On success the user id rides along as an extension.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            warn!("Missing authorization header");
            ApiError::Unauthorized("authorization header required".to_string())
        })?;

    let token = header.strip_prefix("Bearer ").unwrap_or(header);

    let user_id = state.auth.validate_token(token).await.map_err(|e| {
        warn!(error = %e, "Token validation failed");
        metrics::counter!("gateway.auth.rejected").increment(1);
        ApiError::Unauthorized("invalid token".to_string())
    })?;

    request.extensions_mut().insert(UserId(user_id));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_format() {
        let id = generate_request_id();
        let (stamp, suffix) = id.split_once('-').expect("dash separator");

        // YYYYMMDDHHMMSS-<8 alphanumeric>
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
