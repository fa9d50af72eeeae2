//! Redis cache for content records.
//!
//! The cache is advisory. Every failure is logged and swallowed; a miss and
//! a value that no longer decodes look identical to callers.

use crate::config::CacheConfig;
use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

pub struct ContentCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl ContentCache {
    /// Connect to the configured Redis instance
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let client =
            redis::Client::open(config.url.as_str()).context("Failed to parse Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis cache");

        Ok(Self {
            conn,
            ttl_secs: config.ttl_secs,
        })
    }

    /// Look up and decode a cached value; None on miss, error or stale encoding
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = match conn.get(key).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, key, "Cache get failed");
                metrics::counter!("storage.cache.errors").increment(1);
                return None;
            }
        };

        let data = data?;
        match serde_json::from_slice(&data) {
            Ok(value) => {
                metrics::counter!("storage.cache.hits").increment(1);
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, key, "Cached value failed to decode");
                None
            }
        }
    }

    /// Best-effort set with the configured TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let data = match serde_json::to_vec(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, key, "Failed to encode value for cache");
                return;
            }
        };

        let mut conn = self.conn.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, data, self.ttl_secs).await {
            warn!(error = %e, key, "Cache set failed");
            metrics::counter!("storage.cache.errors").increment(1);
        }
    }

    /// Best-effort delete
    pub async fn delete(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(error = %e, key, "Cache delete failed");
            metrics::counter!("storage.cache.errors").increment(1);
        }
    }
}
