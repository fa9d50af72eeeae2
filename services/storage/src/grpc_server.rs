//! gRPC facade exposing the storage service to the gateway.

use crate::models::{Content, ProcessingStatus};
use crate::usecase::{StorageError, StorageUsecase};
use anyhow::{Context, Result};
use sift_pipeline::messages::ContentType;
use sift_protos::storage::storage_service_server::{StorageService, StorageServiceServer};
use sift_protos::storage::{
    content_response, ContentRequest, ContentResponse, ImageContent as ProtoImageContent,
    RegisterContentRequest, RegisterContentResponse, TextContent as ProtoTextContent,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument};
use uuid::Uuid;

fn to_proto_type(content_type: ContentType) -> sift_protos::storage::ContentType {
    match content_type {
        ContentType::Text => sift_protos::storage::ContentType::Text,
        ContentType::Image => sift_protos::storage::ContentType::Image,
    }
}

fn to_proto_status(status: ProcessingStatus) -> sift_protos::storage::ProcessingStatus {
    match status {
        ProcessingStatus::Pending => sift_protos::storage::ProcessingStatus::Pending,
        ProcessingStatus::Processing => sift_protos::storage::ProcessingStatus::Processing,
        ProcessingStatus::Completed => sift_protos::storage::ProcessingStatus::Completed,
        ProcessingStatus::Failed => sift_protos::storage::ProcessingStatus::Failed,
    }
}

fn to_status(e: StorageError) -> Status {
    match e {
        StorageError::NotFound => Status::not_found("content not found"),
        StorageError::InvalidInput(reason) => Status::invalid_argument(reason),
        StorageError::Terminal(reason) => Status::internal(reason),
        StorageError::Transient(_) => Status::internal("storage backend unavailable"),
    }
}

pub struct StorageGrpc {
    usecase: Arc<StorageUsecase>,
}

impl StorageGrpc {
    pub fn new(usecase: Arc<StorageUsecase>) -> Self {
        Self { usecase }
    }

    fn base_response(content: &Content) -> ContentResponse {
        ContentResponse {
            content_id: content.id.to_string(),
            r#type: to_proto_type(content.content_type) as i32,
            status: to_proto_status(content.status) as i32,
            content: None,
        }
    }
}

#[tonic::async_trait]
impl StorageService for StorageGrpc {
    #[instrument(skip(self, request))]
    async fn get_content(
        &self,
        request: Request<ContentRequest>,
    ) -> Result<Response<ContentResponse>, Status> {
        let req = request.into_inner();
        let id = Uuid::parse_str(&req.content_id)
            .map_err(|_| Status::invalid_argument("invalid content id"))?;

        let content = self.usecase.get_content(id).await.map_err(to_status)?;
        let mut resp = Self::base_response(&content);

        match content.content_type {
            ContentType::Text => {
                let text = self.usecase.get_text_content(id).await.map_err(to_status)?;
                resp.status = to_proto_status(text.content.status) as i32;
                resp.content = Some(content_response::Content::Text(ProtoTextContent {
                    original_text: text.original_text,
                    analysis_metadata: text.content.metadata,
                }));
            }
            ContentType::Image => {
                let image = self
                    .usecase
                    .get_image_content(id)
                    .await
                    .map_err(to_status)?;
                resp.status = to_proto_status(image.content.status) as i32;
                resp.content = Some(content_response::Content::Image(ProtoImageContent {
                    image_url: image.image_url,
                    analysis_metadata: image.content.metadata,
                }));
            }
        }

        debug!(content_id = %id, "Content served");
        Ok(Response::new(resp))
    }

    #[instrument(skip(self, request))]
    async fn register_content(
        &self,
        request: Request<RegisterContentRequest>,
    ) -> Result<Response<RegisterContentResponse>, Status> {
        let req = request.into_inner();
        let id = Uuid::parse_str(&req.content_id)
            .map_err(|_| Status::invalid_argument("invalid content id"))?;

        let content_type = match sift_protos::storage::ContentType::try_from(req.r#type) {
            Ok(sift_protos::storage::ContentType::Text) => ContentType::Text,
            Ok(sift_protos::storage::ContentType::Image) => ContentType::Image,
            Err(_) => return Err(Status::invalid_argument("invalid content type")),
        };

        self.usecase
            .register_content(id, content_type)
            .await
            .map_err(to_status)?;

        Ok(Response::new(RegisterContentResponse { success: true }))
    }
}

/// Serve the storage gRPC facade until the shutdown future resolves
pub async fn serve(
    usecase: Arc<StorageUsecase>,
    port: u16,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{port}")
        .parse()
        .context("Invalid gRPC listen address")?;

    info!(address = %addr, "Starting storage gRPC server");

    tonic::transport::Server::builder()
        .add_service(StorageServiceServer::new(StorageGrpc::new(usecase)))
        .serve_with_shutdown(addr, shutdown)
        .await
        .context("gRPC server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            to_proto_status(ProcessingStatus::Processing),
            sift_protos::storage::ProcessingStatus::Processing
        );
        assert_eq!(
            to_proto_status(ProcessingStatus::Completed),
            sift_protos::storage::ProcessingStatus::Completed
        );
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(
            to_proto_type(ContentType::Text),
            sift_protos::storage::ContentType::Text
        );
        assert_eq!(
            to_proto_type(ContentType::Image),
            sift_protos::storage::ContentType::Image
        );
    }

    #[test]
    fn test_not_found_maps_to_grpc_not_found() {
        let status = to_status(StorageError::NotFound);
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status = to_status(StorageError::Transient("db".to_string()));
        assert_eq!(status.code(), tonic::Code::Internal);
        // transient details stay internal
        assert!(!status.message().contains("db"));
    }
}
