//! Kafka producer wrapper for the sift pipeline.
//!
//! This module provides a high-level interface for producing JSON messages
//! to the pipeline topics with delivery confirmation and dead-letter support.

use crate::config::KafkaConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Errors that can occur during message production
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Failed to create producer: {0}")]
    CreationError(String),

    #[error("Failed to serialize message: {0}")]
    SerializationError(String),

    #[error("Failed to send message to topic {topic}: {message}")]
    SendError { topic: String, message: String },

    #[error("Producer timeout after {0:?}")]
    Timeout(Duration),
}

/// Result of a successful message delivery
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Message to be sent to a pipeline topic
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub topic: String,
    /// Message key; the content id, so every frame of an id lands on one partition
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl OutgoingMessage {
    /// Create a new outgoing message with a JSON payload
    pub fn new_json<T: serde::Serialize>(
        topic: impl Into<String>,
        message: &T,
    ) -> Result<Self, ProducerError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| ProducerError::SerializationError(e.to_string()))?;
        Ok(Self {
            topic: topic.into(),
            key: None,
            payload,
            headers: Vec::new(),
        })
    }

    /// Set the message key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a header to the message
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Add a correlation ID header
    pub fn with_correlation_id(self, id: impl Into<String>) -> Self {
        self.with_header("correlation-id", id)
    }
}

/// High-level Kafka producer wrapper
pub struct ContentProducer {
    producer: FutureProducer,
    dead_letter_topic: String,
    default_timeout: Duration,
}

impl ContentProducer {
    /// Create a new producer with the given configuration
    pub fn new(config: &KafkaConfig) -> Result<Self, ProducerError> {
        info!(
            brokers = %config.bootstrap_servers(),
            "Creating Kafka producer"
        );

        let producer: FutureProducer = config
            .build_producer_config()
            .create()
            .map_err(|e| ProducerError::CreationError(e.to_string()))?;

        Ok(Self {
            producer,
            dead_letter_topic: config.topics.dead_letter.clone(),
            default_timeout: config.request_timeout(),
        })
    }

    /// Send a message and wait for delivery confirmation
    #[instrument(skip(self, message), fields(topic = %message.topic, key = ?message.key))]
    pub async fn send(&self, message: OutgoingMessage) -> Result<DeliveryResult, ProducerError> {
        let topic = message.topic.clone();

        let mut record = FutureRecord::to(&topic).payload(&message.payload);
        if let Some(ref k) = message.key {
            record = record.key(k);
        }
        if !message.headers.is_empty() {
            let mut headers = rdkafka::message::OwnedHeaders::new();
            for (k, v) in &message.headers {
                headers = headers.insert(rdkafka::message::Header {
                    key: k,
                    value: Some(v.as_str()),
                });
            }
            record = record.headers(headers);
        }

        debug!(
            size_bytes = message.payload.len(),
            "Sending message to topic {}", topic
        );

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.default_timeout))
            .await
            .map_err(|(e, _)| ProducerError::SendError {
                topic: topic.clone(),
                message: e.to_string(),
            })?;

        debug!(partition, offset, "Message delivered");

        Ok(DeliveryResult {
            topic,
            partition,
            offset,
        })
    }

    /// Serialize a value as JSON and send it keyed by the given id
    pub async fn send_json<T: serde::Serialize>(
        &self,
        topic: &str,
        key: &str,
        message: &T,
    ) -> Result<DeliveryResult, ProducerError> {
        let message = OutgoingMessage::new_json(topic, message)?.with_key(key);
        self.send(message).await
    }

    /// Send a frame that could not be processed to the dead letter topic
    ///
    /// The original payload is base64-encoded into an envelope together with
    /// the source topic and the error that killed it.
    pub async fn send_to_dead_letter(
        &self,
        original_topic: &str,
        original_payload: &[u8],
        error: &str,
    ) -> Result<DeliveryResult, ProducerError> {
        let envelope = serde_json::json!({
            "original_topic": original_topic,
            "payload_base64": BASE64.encode(original_payload),
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let message = OutgoingMessage::new_json(&self.dead_letter_topic, &envelope)?
            .with_key(Uuid::new_v4().to_string())
            .with_header("original-topic", original_topic)
            .with_header("error-reason", error);

        self.send(message).await
    }

    /// Flush all pending messages
    pub fn flush(&self, timeout: Duration) -> Result<(), ProducerError> {
        self.producer
            .flush(Timeout::After(timeout))
            .map_err(|_| ProducerError::Timeout(timeout))
    }
}

impl Drop for ContentProducer {
    fn drop(&mut self) {
        debug!("Shutting down Kafka producer");
        if let Err(e) = self.flush(Duration::from_secs(5)) {
            warn!("Failed to flush producer on shutdown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_message_builder() {
        let message = OutgoingMessage::new_json("test", &serde_json::json!({"a": 1}))
            .unwrap()
            .with_key("my-key")
            .with_header("header1", "value1")
            .with_correlation_id("corr-123");

        assert_eq!(message.key, Some("my-key".to_string()));
        assert_eq!(message.headers.len(), 2);
        assert_eq!(message.headers[1].0, "correlation-id");
    }

    #[test]
    fn test_dead_letter_envelope_shape() {
        let envelope = serde_json::json!({
            "original_topic": "content.text",
            "payload_base64": BASE64.encode(b"oops"),
            "error": "decode failure",
            "timestamp": "2024-01-15T10:30:00Z",
        });

        assert_eq!(envelope["original_topic"], "content.text");
        assert_eq!(envelope["payload_base64"], "b29wcw==");
    }
}
