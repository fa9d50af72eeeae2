//! Postgres persistence for content headers and type-specific payloads.

use crate::config::RepoConfig;
use crate::models::{Content, ImageContent, ProcessingStatus, TextContent};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sift_pipeline::messages::ContentType;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Errors surfaced by repository operations
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("content not found")]
    NotFound,

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(FromRow)]
struct ContentRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    content_type: String,
    status: String,
    metadata: sqlx::types::Json<HashMap<String, String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for Content {
    type Error = RepoError;

    fn try_from(row: ContentRow) -> Result<Self, RepoError> {
        let content_type = ContentType::parse(&row.content_type)
            .ok_or_else(|| RepoError::Corrupt(format!("unknown content type {:?}", row.content_type)))?;
        let status = ProcessingStatus::parse(&row.status)
            .ok_or_else(|| RepoError::Corrupt(format!("unknown status {:?}", row.status)))?;

        Ok(Content {
            id: row.id,
            content_type,
            status,
            metadata: row.metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository over the `content`, `text_content` and `image_content` tables
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    /// Connect a pool against the configured DSN
    pub async fn new(config: &RepoConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.dsn)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Insert a header if the id is unseen; an existing id is left untouched
    #[instrument(skip(self, content), fields(content_id = %content.id))]
    pub async fn create_if_absent(&self, content: &Content) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO content (id, type, status, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(content.id)
        .bind(content.content_type.as_str())
        .bind(content.status.as_str())
        .bind(sqlx::types::Json(&content.metadata))
        .bind(content.created_at)
        .bind(content.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("Header registered");
        Ok(())
    }

    /// Fetch the header for an id
    pub async fn get_content(&self, id: Uuid) -> Result<Content, RepoError> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT id, type, status, metadata, created_at, updated_at
            FROM content
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;

        row.try_into()
    }

    /// Fetch the header joined with the text payload row
    pub async fn get_text_content(&self, id: Uuid) -> Result<TextContent, RepoError> {
        let content = self.get_content(id).await?;

        let original_text: String = sqlx::query_scalar(
            "SELECT original_text FROM text_content WHERE content_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;

        Ok(TextContent {
            content,
            original_text,
        })
    }

    /// Fetch the header joined with the image payload row
    pub async fn get_image_content(&self, id: Uuid) -> Result<ImageContent, RepoError> {
        let content = self.get_content(id).await?;

        let image_url: String =
            sqlx::query_scalar("SELECT s3_key FROM image_content WHERE content_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepoError::NotFound)?;

        Ok(ImageContent { content, image_url })
    }

    /// Lock the header row and report its current status
    async fn lock_status(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
    ) -> Result<ProcessingStatus, RepoError> {
        let status: String =
            sqlx::query_scalar("SELECT status FROM content WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(RepoError::NotFound)?;

        ProcessingStatus::parse(&status)
            .ok_or_else(|| RepoError::Corrupt(format!("unknown status {status:?}")))
    }

    /// Update the header and upsert the text payload in one transaction.
    /// A replayed or out-of-order frame that would move the status to the
    /// same or an earlier state writes nothing.
    #[instrument(skip(self, content), fields(content_id = %content.content.id))]
    pub async fn upsert_text(&self, content: &TextContent) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_status(&mut tx, content.content.id).await?;
        if !current.advances_to(content.content.status) {
            debug!(
                current = current.as_str(),
                target = content.content.status.as_str(),
                "Status already at or past target, skipping"
            );
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE content
            SET status = $2, metadata = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(content.content.id)
        .bind(content.content.status.as_str())
        .bind(sqlx::types::Json(&content.content.metadata))
        .bind(content.content.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO text_content (content_id, original_text)
            VALUES ($1, $2)
            ON CONFLICT (content_id) DO UPDATE SET original_text = EXCLUDED.original_text
            "#,
        )
        .bind(content.content.id)
        .bind(&content.original_text)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Text content upserted");
        Ok(true)
    }

    /// Update the header and upsert the image payload in one transaction,
    /// with the same replay protection as the text path
    #[instrument(skip(self, content), fields(content_id = %content.content.id))]
    pub async fn upsert_image(&self, content: &ImageContent) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_status(&mut tx, content.content.id).await?;
        if !current.advances_to(content.content.status) {
            debug!(
                current = current.as_str(),
                target = content.content.status.as_str(),
                "Status already at or past target, skipping"
            );
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE content
            SET status = $2, metadata = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(content.content.id)
        .bind(content.content.status.as_str())
        .bind(sqlx::types::Json(&content.content.metadata))
        .bind(content.content.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO image_content (content_id, s3_key)
            VALUES ($1, $2)
            ON CONFLICT (content_id) DO UPDATE SET s3_key = EXCLUDED.s3_key
            "#,
        )
        .bind(content.content.id)
        .bind(&content.image_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Image content upserted");
        Ok(true)
    }

    /// Update only the header status; regressions are no-ops
    pub async fn update_status(&self, id: Uuid, status: ProcessingStatus) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_status(&mut tx, id).await?;
        if !current.advances_to(status) {
            debug!(
                content_id = %id,
                current = current.as_str(),
                target = status.as_str(),
                "Status already at or past target, skipping"
            );
            return Ok(false);
        }

        sqlx::query("UPDATE content SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Get the connection pool (for health checks)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_row_conversion() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = ContentRow {
            id,
            content_type: "text".to_string(),
            status: "processing".to_string(),
            metadata: sqlx::types::Json(HashMap::new()),
            created_at: now,
            updated_at: now,
        };

        let content: Content = row.try_into().unwrap();
        assert_eq!(content.id, id);
        assert_eq!(content.content_type, ContentType::Text);
        assert_eq!(content.status, ProcessingStatus::Processing);
    }

    #[test]
    fn test_content_row_rejects_unknown_status() {
        let row = ContentRow {
            id: Uuid::new_v4(),
            content_type: "text".to_string(),
            status: "paused".to_string(),
            metadata: sqlx::types::Json(HashMap::new()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        match Content::try_from(row) {
            Err(RepoError::Corrupt(reason)) => assert!(reason.contains("paused")),
            other => panic!("expected corrupt row, got {other:?}"),
        }
    }
}
