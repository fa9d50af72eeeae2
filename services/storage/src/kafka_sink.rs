//! Kafka sinks terminating the pipeline: one consumer per results topic,
//! writing completed records through the storage use-case.

use crate::usecase::{StorageError, StorageUsecase};
use sift_pipeline::consumer::{async_trait, FrameHandler, HandleError, IncomingFrame};
use sift_pipeline::messages::{ImageScoredMessage, TextResultMessage};
use std::sync::Arc;
use tracing::{debug, info};

fn map_storage_error(e: StorageError) -> HandleError {
    match e {
        StorageError::Transient(reason) => HandleError::Transient(reason),
        // NotFound / InvalidInput / Terminal: redelivery cannot help
        other => HandleError::Terminal(other.to_string()),
    }
}

/// Sink for analyzed text results
pub struct TextSink {
    usecase: Arc<StorageUsecase>,
}

impl TextSink {
    pub fn new(usecase: Arc<StorageUsecase>) -> Self {
        Self { usecase }
    }
}

#[async_trait]
impl FrameHandler for TextSink {
    async fn handle(&self, frame: IncomingFrame) -> Result<(), HandleError> {
        let msg: TextResultMessage = frame.decode_json()?;

        debug!(content_id = %msg.id, "Received text result");

        if let Err(e) = self.usecase.process_text_message(&msg).await {
            let mapped = map_storage_error(e);
            if matches!(mapped, HandleError::Terminal(_)) {
                // Route the record to its failed terminal state before the
                // frame is dead-lettered; best effort
                let _ = self.usecase.mark_failed(msg.id).await;
            }
            return Err(mapped);
        }

        info!(content_id = %msg.id, "Text content saved");
        metrics::counter!("storage.sink.text_messages").increment(1);
        Ok(())
    }
}

/// Sink for NSFW-scored images
pub struct ImageSink {
    usecase: Arc<StorageUsecase>,
}

impl ImageSink {
    pub fn new(usecase: Arc<StorageUsecase>) -> Self {
        Self { usecase }
    }
}

#[async_trait]
impl FrameHandler for ImageSink {
    async fn handle(&self, frame: IncomingFrame) -> Result<(), HandleError> {
        let msg: ImageScoredMessage = frame.decode_json()?;

        debug!(content_id = %msg.id, is_nsfw = msg.is_nsfw, "Received scored image");

        if let Err(e) = self.usecase.process_image_message(&msg).await {
            let mapped = map_storage_error(e);
            if matches!(mapped, HandleError::Terminal(_)) {
                let _ = self.usecase.mark_failed(msg.id).await;
            }
            return Err(mapped);
        }

        info!(content_id = %msg.id, "Image content saved");
        metrics::counter!("storage.sink.image_messages").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_bubble_for_redelivery() {
        let mapped = map_storage_error(StorageError::Transient("db down".to_string()));
        assert!(matches!(mapped, HandleError::Transient(_)));
    }

    #[test]
    fn test_terminal_errors_are_dead_lettered() {
        for e in [
            StorageError::Terminal("bad base64".to_string()),
            StorageError::NotFound,
            StorageError::InvalidInput("nope".to_string()),
        ] {
            assert!(matches!(map_storage_error(e), HandleError::Terminal(_)));
        }
    }
}
