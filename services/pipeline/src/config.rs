//! Kafka configuration shared by every sift service.
//!
//! Each service embeds a [`KafkaConfig`] in its own configuration struct and
//! builds rdkafka client configs from it.

use rdkafka::config::ClientConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Topic configuration for the sift pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Topic carrying raw text uploads from the gateway
    #[serde(default = "default_text_topic")]
    pub text: String,
    /// Topic carrying analyzed text on its way to the storage sink
    #[serde(default = "default_text_results_topic")]
    pub text_results: String,
    /// Topic carrying raw image uploads from the gateway
    #[serde(default = "default_image_uploads_topic")]
    pub image_uploads: String,
    /// Topic carrying NSFW-scored images on their way to the storage sink
    #[serde(default = "default_images_topic")]
    pub images: String,
    /// Dead letter topic
    #[serde(default = "default_dead_letter_topic")]
    pub dead_letter: String,
}

fn default_text_topic() -> String {
    "content.text".to_string()
}

fn default_text_results_topic() -> String {
    "content.text.results".to_string()
}

fn default_image_uploads_topic() -> String {
    "content.image.uploads".to_string()
}

fn default_images_topic() -> String {
    "content.images".to_string()
}

fn default_dead_letter_topic() -> String {
    "content.dead_letter".to_string()
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            text: default_text_topic(),
            text_results: default_text_results_topic(),
            image_uploads: default_image_uploads_topic(),
            images: default_images_topic(),
            dead_letter: default_dead_letter_topic(),
        }
    }
}

/// Main Kafka configuration for the sift pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Broker addresses
    #[serde(default = "default_brokers")]
    pub brokers: Vec<String>,
    /// Client ID for this connection
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Consumer group ID
    #[serde(default = "default_group_id")]
    pub group_id: String,
    /// Auto offset reset: earliest, latest, none
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Delivery / request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long to wait for the broker leader when connecting, in seconds
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
    /// Topic configuration
    #[serde(default)]
    pub topics: TopicConfig,
}

fn default_brokers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_client_id() -> String {
    "sift".to_string()
}

fn default_group_id() -> String {
    "sift".to_string()
}

fn default_auto_offset_reset() -> String {
    "earliest".to_string()
}

fn default_session_timeout_ms() -> u64 {
    30000
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_dial_timeout_secs() -> u64 {
    15
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            group_id: default_group_id(),
            auto_offset_reset: default_auto_offset_reset(),
            session_timeout_ms: default_session_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            dial_timeout_secs: default_dial_timeout_secs(),
            topics: TopicConfig::default(),
        }
    }
}

impl KafkaConfig {
    /// Comma-separated broker list in the form rdkafka expects
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }

    /// Build a base rdkafka ClientConfig from this configuration
    fn build_base_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", self.bootstrap_servers());
        config.set("client.id", &self.client_id);
        config.set(
            "socket.timeout.ms",
            (self.dial_timeout_secs * 1000).to_string(),
        );
        config
    }

    /// Build a producer ClientConfig
    pub fn build_producer_config(&self) -> ClientConfig {
        let mut config = self.build_base_config();
        config.set("acks", "all");
        config.set("request.timeout.ms", self.request_timeout_ms.to_string());
        config.set("message.timeout.ms", self.request_timeout_ms.to_string());
        config
    }

    /// Build a consumer ClientConfig
    ///
    /// Auto-commit is always off: offsets advance only after a frame has been
    /// fully applied, which is what gives the pipeline at-least-once delivery.
    pub fn build_consumer_config(&self) -> ClientConfig {
        let mut config = self.build_base_config();
        config.set("group.id", &self.group_id);
        config.set("auto.offset.reset", &self.auto_offset_reset);
        config.set("enable.auto.commit", "false");
        config.set("session.timeout.ms", self.session_timeout_ms.to_string());
        config
    }

    /// Get the broker dial timeout as Duration
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Get the request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brokers.is_empty() {
            return Err(ConfigError::MissingRequired("kafka.brokers".to_string()));
        }
        if self.group_id.is_empty() {
            return Err(ConfigError::MissingRequired("kafka.group_id".to_string()));
        }
        match self.auto_offset_reset.as_str() {
            "earliest" | "latest" | "none" => Ok(()),
            other => Err(ConfigError::InvalidValue {
                key: "kafka.auto_offset_reset".to_string(),
                message: format!("unknown policy {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KafkaConfig::default();
        assert_eq!(config.bootstrap_servers(), "localhost:9092");
        assert_eq!(config.topics.text, "content.text");
        assert_eq!(config.topics.dead_letter, "content.dead_letter");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bootstrap_servers_joined() {
        let config = KafkaConfig {
            brokers: vec!["a:9092".to_string(), "b:9092".to_string()],
            ..Default::default()
        };
        assert_eq!(config.bootstrap_servers(), "a:9092,b:9092");
    }

    #[test]
    fn test_consumer_config_disables_auto_commit() {
        let config = KafkaConfig::default();
        let consumer_config = config.build_consumer_config();
        assert_eq!(
            consumer_config.get("enable.auto.commit"),
            Some("false")
        );
        assert!(consumer_config.get("group.id").is_some());
    }

    #[test]
    fn test_validate_rejects_empty_brokers() {
        let config = KafkaConfig {
            brokers: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_offset_reset() {
        let config = KafkaConfig {
            auto_offset_reset: "sometimes".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
