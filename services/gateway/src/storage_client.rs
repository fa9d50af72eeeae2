//! gRPC client for the storage service.

use crate::config::UpstreamConfig;
use crate::error::ApiError;
use anyhow::{Context, Result};
use sift_pipeline::messages::ContentType;
use sift_protos::storage::storage_service_client::StorageServiceClient;
use sift_protos::storage::{content_response, ContentRequest, RegisterContentRequest};
use std::collections::HashMap;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Content record as seen by the HTTP surface
#[derive(Debug, Clone)]
pub struct ContentStatus {
    pub id: String,
    pub content_type: String,
    pub status: String,
    /// Original text or image URL; empty until processing completes
    pub data: String,
    pub analysis: HashMap<String, String>,
}

fn status_label(status: sift_protos::storage::ProcessingStatus) -> &'static str {
    match status {
        sift_protos::storage::ProcessingStatus::Pending => "pending",
        sift_protos::storage::ProcessingStatus::Processing => "processing",
        sift_protos::storage::ProcessingStatus::Completed => "completed",
        sift_protos::storage::ProcessingStatus::Failed => "failed",
    }
}

fn type_label(content_type: sift_protos::storage::ContentType) -> &'static str {
    match content_type {
        sift_protos::storage::ContentType::Text => "text",
        sift_protos::storage::ContentType::Image => "image",
    }
}

#[derive(Clone)]
pub struct StorageClient {
    client: StorageServiceClient<Channel>,
}

impl StorageClient {
    /// Create a client for the configured address; lazy like the auth client
    pub fn connect(config: &UpstreamConfig) -> Result<Self> {
        let endpoint = Endpoint::from_shared(config.service_address.clone())
            .context("Invalid storage service address")?
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs));

        let channel = endpoint.connect_lazy();

        Ok(Self {
            client: StorageServiceClient::new(channel),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_content(&self, content_id: Uuid) -> Result<ContentStatus, ApiError> {
        let resp = self
            .client
            .clone()
            .get_content(ContentRequest {
                content_id: content_id.to_string(),
            })
            .await
            .map_err(ApiError::from)?
            .into_inner();

        let status = sift_protos::storage::ProcessingStatus::try_from(resp.status)
            .map(status_label)
            .unwrap_or("pending");
        let content_type = sift_protos::storage::ContentType::try_from(resp.r#type)
            .map(type_label)
            .unwrap_or("text");

        let (data, analysis) = match resp.content {
            Some(content_response::Content::Text(text)) => {
                (text.original_text, text.analysis_metadata)
            }
            Some(content_response::Content::Image(image)) => {
                (image.image_url, image.analysis_metadata)
            }
            None => (String::new(), HashMap::new()),
        };

        debug!(content_id = %resp.content_id, status, "Content fetched");

        Ok(ContentStatus {
            id: resp.content_id,
            content_type: content_type.to_string(),
            status: status.to_string(),
            data,
            analysis,
        })
    }

    #[instrument(skip(self))]
    pub async fn register_content(
        &self,
        content_id: Uuid,
        content_type: ContentType,
    ) -> Result<(), ApiError> {
        let proto_type = match content_type {
            ContentType::Text => sift_protos::storage::ContentType::Text,
            ContentType::Image => sift_protos::storage::ContentType::Image,
        };

        self.client
            .clone()
            .register_content(RegisterContentRequest {
                content_id: content_id.to_string(),
                r#type: proto_type as i32,
            })
            .await
            .map_err(ApiError::from)?;

        debug!(content_id = %content_id, "Content registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_are_lowercase() {
        assert_eq!(
            status_label(sift_protos::storage::ProcessingStatus::Processing),
            "processing"
        );
        assert_eq!(
            status_label(sift_protos::storage::ProcessingStatus::Completed),
            "completed"
        );
        assert_eq!(
            status_label(sift_protos::storage::ProcessingStatus::Failed),
            "failed"
        );
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(type_label(sift_protos::storage::ContentType::Text), "text");
        assert_eq!(type_label(sift_protos::storage::ContentType::Image), "image");
    }
}
