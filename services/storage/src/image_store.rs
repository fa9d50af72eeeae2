//! S3 object store for uploaded images.
//!
//! Keys follow `images/<unix_seconds>/<uuid>`. Objects are world-readable;
//! downstream readers fetch them straight from the returned URL.

use crate::config::S3Config;
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;
use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub struct ImageStore {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl ImageStore {
    /// Create a new image store against the configured endpoint
    pub async fn new(config: &S3Config) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "sift-config",
            ));
        }

        let aws_config = loader.load().await;
        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 image store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            public_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Create the bucket if it does not exist yet; already-exists is success
    pub async fn ensure_bucket(&self) -> Result<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        match self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => {
                info!(bucket = %self.bucket, "Bucket created");
                Ok(())
            }
            Err(e) => {
                let already_there = e.as_service_error().is_some_and(|se| {
                    se.is_bucket_already_owned_by_you() || se.is_bucket_already_exists()
                });
                if already_there {
                    Ok(())
                } else {
                    Err(e).context("Failed to create bucket")
                }
            }
        }
    }

    /// Store image bytes under a generated key
    #[instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn put(&self, data: Vec<u8>) -> Result<String> {
        let key = format!("images/{}/{}", Utc::now().timestamp(), Uuid::new_v4());
        let content_type = sniff_content_type(&data, &key);

        debug!(key = %key, content_type, "Uploading image to S3");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .context("Failed to upload image to S3")?;

        metrics::counter!("storage.images.uploaded").increment(1);

        Ok(key)
    }

    /// Public URL for a stored key
    pub fn url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }
}

/// Content type from leading bytes, falling back to the key extension
fn sniff_content_type(data: &[u8], key: &str) -> &'static str {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type();
    }

    match key.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_jpeg_magic() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
        assert_eq!(sniff_content_type(&jpeg, "images/1/abc"), "image/jpeg");
    }

    #[test]
    fn test_sniff_png_magic() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_content_type(&png, "images/1/abc"), "image/png");
    }

    #[test]
    fn test_sniff_falls_back_to_extension() {
        assert_eq!(sniff_content_type(b"plainbytes", "images/1/abc.png"), "image/png");
        assert_eq!(sniff_content_type(b"plainbytes", "images/1/abc.JPG"), "image/jpeg");
    }

    #[test]
    fn test_sniff_defaults_to_octet_stream() {
        assert_eq!(
            sniff_content_type(b"plainbytes", "images/1/abc"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_key_scheme() {
        // The key format is fixed: images/<unix>/<uuid>
        let key = format!("images/{}/{}", 1_700_000_000, Uuid::new_v4());
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "images");
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(Uuid::parse_str(parts[2]).is_ok());
    }
}
