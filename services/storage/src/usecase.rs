//! Storage orchestration: cache-aside reads, idempotent pre-registration,
//! and the sink-side state machine applied to analyzer results.

use crate::content_repo::{ContentRepository, RepoError};
use crate::image_store::ImageStore;
use crate::models::{Content, ImageContent, ProcessingStatus, TextContent};
use crate::redis_cache::ContentCache;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use sift_pipeline::messages::{
    AnalysisResult, ContentType, ImageScoredMessage, NsfwScores, TextResultMessage,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Errors surfaced by the storage use-case
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("content not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The message can never be applied (malformed payload, missing header)
    #[error("unprocessable message: {0}")]
    Terminal(String),

    /// A backend hiccuped; the caller may retry
    #[error("storage backend: {0}")]
    Transient(String),
}

impl From<RepoError> for StorageError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => StorageError::NotFound,
            RepoError::Corrupt(reason) => StorageError::Terminal(reason),
            RepoError::Database(e) => StorageError::Transient(e.to_string()),
        }
    }
}

/// Flatten a text analysis verdict into the header metadata map
pub fn flatten_analysis(result: &AnalysisResult) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("is_approved".to_string(), result.is_approved.to_string());
    metadata.insert("is_spam".to_string(), result.is_spam.to_string());
    metadata.insert(
        "has_sensitive".to_string(),
        result.has_sensitive.to_string(),
    );
    metadata.insert("language".to_string(), result.language.clone());
    metadata.insert("sentiment".to_string(), format!("{:.2}", result.sentiment));
    metadata
}

/// Flatten NSFW category scores into the header metadata map
pub fn flatten_nsfw_scores(scores: &NsfwScores) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("drawings".to_string(), format!("{:.6}", scores.drawings));
    metadata.insert("hentai".to_string(), format!("{:.6}", scores.hentai));
    metadata.insert("neutral".to_string(), format!("{:.6}", scores.neutral));
    metadata.insert("porn".to_string(), format!("{:.6}", scores.porn));
    metadata.insert("sexy".to_string(), format!("{:.6}", scores.sexy));
    metadata
}

pub struct StorageUsecase {
    repo: ContentRepository,
    cache: ContentCache,
    images: ImageStore,
}

impl StorageUsecase {
    pub fn new(repo: ContentRepository, cache: ContentCache, images: ImageStore) -> Self {
        Self {
            repo,
            cache,
            images,
        }
    }

    /// Idempotent pre-registration: write a `processing` header for the id.
    /// Registering the same id twice is a no-op.
    #[instrument(skip(self))]
    pub async fn register_content(
        &self,
        id: Uuid,
        content_type: ContentType,
    ) -> Result<(), StorageError> {
        let content = Content::pre_registered(id, content_type);
        self.repo.create_if_absent(&content).await?;

        debug!(content_id = %id, "Content pre-registered");
        metrics::counter!("storage.content.registered").increment(1);
        Ok(())
    }

    /// Cache-aside read of the content header
    pub async fn get_content(&self, id: Uuid) -> Result<Content, StorageError> {
        let key = id.to_string();
        if let Some(content) = self.cache.get::<Content>(&key).await {
            return Ok(content);
        }

        let content = self.repo.get_content(id).await?;
        self.cache.set(&key, &content).await;

        Ok(content)
    }

    /// Read a text record. In-flight content yields a placeholder with an
    /// empty payload instead of a not-found error.
    pub async fn get_text_content(&self, id: Uuid) -> Result<TextContent, StorageError> {
        let content = self.get_content(id).await?;
        if content.content_type != ContentType::Text {
            return Err(StorageError::InvalidInput(
                "content is not text".to_string(),
            ));
        }

        if content.status == ProcessingStatus::Completed {
            return Ok(self.repo.get_text_content(id).await?);
        }

        // Still in flight: synthesize from the header, never touch the payload table
        Ok(TextContent::placeholder(content))
    }

    /// Read an image record, with the same placeholder behavior as text
    pub async fn get_image_content(&self, id: Uuid) -> Result<ImageContent, StorageError> {
        let content = self.get_content(id).await?;
        if content.content_type != ContentType::Image {
            return Err(StorageError::InvalidInput(
                "content is not an image".to_string(),
            ));
        }

        if content.status == ProcessingStatus::Completed {
            return Ok(self.repo.get_image_content(id).await?);
        }

        Ok(ImageContent::placeholder(content))
    }

    /// Apply an analyzed text message: complete the header and upsert the
    /// payload atomically. Redelivery lands on the same state.
    #[instrument(skip(self, msg), fields(content_id = %msg.id))]
    pub async fn process_text_message(&self, msg: &TextResultMessage) -> Result<(), StorageError> {
        let now = Utc::now();
        let text = TextContent {
            content: Content {
                id: msg.id,
                content_type: ContentType::Text,
                status: ProcessingStatus::Completed,
                metadata: flatten_analysis(&msg.result),
                created_at: now,
                updated_at: now,
            },
            original_text: msg.data.clone(),
        };

        let applied = match self.repo.upsert_text(&text).await {
            Ok(applied) => applied,
            // A result with no header means registration never happened;
            // retrying cannot create it
            Err(RepoError::NotFound) => {
                return Err(StorageError::Terminal(format!(
                    "no header registered for content {}",
                    msg.id
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if applied {
            self.cache.set(&msg.id.to_string(), &text).await;
            metrics::counter!("storage.text.completed").increment(1);
        }
        Ok(())
    }

    /// Apply a scored image message: decode, store the object, complete the
    /// record. Base64 garbage is terminal; a flaky object store is not.
    #[instrument(skip(self, msg), fields(content_id = %msg.id))]
    pub async fn process_image_message(
        &self,
        msg: &ImageScoredMessage,
    ) -> Result<(), StorageError> {
        let data = BASE64
            .decode(&msg.data)
            .map_err(|e| StorageError::Terminal(format!("can't decode image: {e}")))?;

        let key = self
            .images
            .put(data)
            .await
            .map_err(|e| StorageError::Transient(format!("object store put: {e}")))?;
        let url = self.images.url(&key);

        let now = Utc::now();
        let image = ImageContent {
            content: Content {
                id: msg.id,
                content_type: ContentType::Image,
                status: ProcessingStatus::Completed,
                metadata: flatten_nsfw_scores(&msg.nsfw_scores),
                created_at: now,
                updated_at: now,
            },
            image_url: url,
        };

        let applied = match self.repo.upsert_image(&image).await {
            Ok(applied) => applied,
            Err(RepoError::NotFound) => {
                return Err(StorageError::Terminal(format!(
                    "no header registered for content {}",
                    msg.id
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if applied {
            self.cache.set(&msg.id.to_string(), &image).await;
            metrics::counter!("storage.images.completed").increment(1);
        }
        Ok(())
    }

    /// Mark a record failed, used by the error router
    pub async fn mark_failed(&self, id: Uuid) -> Result<(), StorageError> {
        let applied = match self.repo.update_status(id, ProcessingStatus::Failed).await {
            Ok(applied) => applied,
            Err(e) => {
                warn!(content_id = %id, error = %e, "Failed to mark content as failed");
                return Err(e.into());
            }
        };
        if applied {
            self.cache.delete(&id.to_string()).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_analysis_keys() {
        let result = AnalysisResult {
            is_approved: true,
            is_spam: false,
            has_sensitive: false,
            sentiment: 0.1,
            language: "en".to_string(),
        };

        let metadata = flatten_analysis(&result);
        assert_eq!(metadata.get("is_approved").map(String::as_str), Some("true"));
        assert_eq!(metadata.get("is_spam").map(String::as_str), Some("false"));
        assert_eq!(
            metadata.get("has_sensitive").map(String::as_str),
            Some("false")
        );
        assert_eq!(metadata.get("language").map(String::as_str), Some("en"));
        assert_eq!(metadata.get("sentiment").map(String::as_str), Some("0.10"));
    }

    #[test]
    fn test_flatten_nsfw_scores_decimal_strings() {
        let scores = NsfwScores {
            drawings: 0.1,
            hentai: 0.0,
            neutral: 0.75,
            porn: 0.05,
            sexy: 0.1,
        };

        let metadata = flatten_nsfw_scores(&scores);
        assert_eq!(metadata.len(), 5);
        assert_eq!(metadata.get("neutral").map(String::as_str), Some("0.750000"));
        assert_eq!(metadata.get("hentai").map(String::as_str), Some("0.000000"));
    }

    #[test]
    fn test_repo_error_mapping() {
        assert!(matches!(
            StorageError::from(RepoError::NotFound),
            StorageError::NotFound
        ));
        assert!(matches!(
            StorageError::from(RepoError::Corrupt("bad".to_string())),
            StorageError::Terminal(_)
        ));
    }
}
