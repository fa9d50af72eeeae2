//! Content ingress: accept a submission, pre-register it with the storage
//! service, and hand it to the pipeline.

use crate::error::ApiError;
use crate::middleware::UserId;
use crate::state::AppState;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sift_pipeline::messages::{ContentType, ImageIngressMessage, TextIngressMessage};
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Largest accepted image upload
const MAX_IMAGE_BYTES: usize = 1 << 20;

#[derive(Debug, Deserialize)]
pub struct TextUploadRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub status: &'static str,
}

/// Allocate an id, pre-register the record, publish the ingress message.
///
/// Pre-registration goes first so a read in the gap between accept and
/// analyzer completion sees a `processing` placeholder instead of a 404.
async fn accept_content(
    state: &AppState,
    user_id: String,
    content_type: ContentType,
    data: String,
    data_type: &str,
) -> Result<Uuid, ApiError> {
    let id = Uuid::new_v4();

    state
        .storage
        .register_content(id, content_type)
        .await
        .map_err(|e| {
            error!(content_id = %id, error = %e, "Content registration failed");
            ApiError::Internal
        })?;

    let key = id.to_string();
    let delivery = match content_type {
        ContentType::Text => {
            let message = TextIngressMessage {
                id,
                user_id,
                content_type,
                data,
                data_type: data_type.to_string(),
            };
            state
                .producer
                .send_json(&state.topics.text, &key, &message)
                .await
        }
        ContentType::Image => {
            let message = ImageIngressMessage {
                id,
                user_id,
                content_type,
                data,
                data_type: data_type.to_string(),
            };
            state
                .producer
                .send_json(&state.topics.image_uploads, &key, &message)
                .await
        }
    };

    delivery.map_err(|e| {
        error!(content_id = %id, error = %e, "Content publish failed");
        ApiError::Internal
    })?;

    metrics::counter!("gateway.content.accepted", "type" => content_type.as_str()).increment(1);

    Ok(id)
}

#[instrument(skip(state, user_id, req))]
pub async fn upload_text(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(req): Json<TextUploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::InvalidInput("invalid request".to_string()));
    }

    let id = accept_content(&state, user_id, ContentType::Text, req.text, "text/plain").await?;

    info!(content_id = %id, "Text accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            id,
            status: "processing",
        }),
    ))
}

#[instrument(skip(state, user_id, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::InvalidInput("invalid image".to_string()))?
    {
        if field.name() == Some("image") {
            image = Some(
                field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::InvalidInput("invalid image".to_string()))?,
            );
            break;
        }
    }

    let bytes = image.ok_or_else(|| ApiError::InvalidInput("invalid image".to_string()))?;

    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::InvalidInput(
            "image file too large, max 1MB".to_string(),
        ));
    }

    let mime = sniff_image_mime(&bytes)
        .ok_or_else(|| ApiError::InvalidInput("uploaded file is not an image".to_string()))?;

    let data = BASE64.encode(&bytes);
    let id = accept_content(&state, user_id, ContentType::Image, data, mime).await?;

    info!(content_id = %id, size_bytes = bytes.len(), "Image accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            id,
            status: "processing",
        }),
    ))
}

#[instrument(skip(state, _user_id))]
pub async fn get_content(
    State(state): State<AppState>,
    Extension(_user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::InvalidInput("invalid content id".to_string()))?;

    let content = state.storage.get_content(id).await?;

    let mut body = json!({
        "id": content.id,
        "status": content.status,
        "type": content.content_type,
    });

    if !content.analysis.is_empty() {
        body["analysis"] = json!(content.analysis);
    }

    // Payloads are disclosed only once analysis has completed
    if content.status == "completed" {
        body["data"] = json!(content.data);
    }

    Ok(Json(body))
}

/// MIME type from the leading bytes, only if it is an image
fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    let mime = kind.mime_type();
    mime.starts_with("image/").then_some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_accepts_png() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        assert_eq!(sniff_image_mime(&png), Some("image/png"));
    }

    #[test]
    fn test_sniff_rejects_text() {
        assert_eq!(sniff_image_mime(b"just some text, not an image"), None);
    }

    #[test]
    fn test_sniff_rejects_pdf() {
        let pdf = b"%PDF-1.7 ...";
        assert_eq!(sniff_image_mime(pdf), None);
    }

    #[test]
    fn test_max_image_bytes_is_one_mebibyte() {
        assert_eq!(MAX_IMAGE_BYTES, 1_048_576);
    }
}
