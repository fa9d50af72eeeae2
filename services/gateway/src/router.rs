//! Route table for the gateway.

use crate::state::AppState;
use crate::{auth_handlers, content_handlers, middleware as gw_middleware};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/content/text", post(content_handlers::upload_text))
        .route("/content/image", post(content_handlers::upload_image))
        .route("/content/:id", get(content_handlers::get_content))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gw_middleware::auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/refresh", post(auth_handlers::refresh))
        .merge(protected)
        .fallback(not_found)
        .layer(middleware::from_fn(gw_middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "sift-gateway"
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "endpoint not found" })),
    )
}
