//! Kafka consumer wrapper for the sift pipeline.
//!
//! One [`ContentConsumer`] owns one topic subscription and drives a
//! [`FrameHandler`] frame by frame. Delivery is at-least-once: the offset is
//! committed only after the handler has fully applied a frame, so a crash
//! replays uncommitted frames on restart.
//!
//! Failures are split into two kinds. A [`HandleError::Terminal`] frame can
//! never succeed (malformed JSON, oversized payload); it is routed to the
//! dead-letter topic and its offset is committed. A [`HandleError::Transient`]
//! failure (the database is down, the object store timed out) aborts the loop
//! without committing, so the process supervisor restarts from the last
//! committed offset and the frame is redelivered.

use crate::config::KafkaConfig;
use crate::producer::ContentProducer;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

pub use async_trait::async_trait;

/// Errors that can occur while running a consumer
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Failed to create consumer: {0}")]
    CreationError(String),

    #[error("Failed to subscribe to topic {topic}: {message}")]
    SubscriptionError { topic: String, message: String },

    #[error("Failed to commit offset: {0}")]
    CommitError(String),

    #[error("Frame processing failed: {0}")]
    ProcessingError(String),
}

/// How a handler failed on a frame
#[derive(Error, Debug)]
pub enum HandleError {
    /// The frame can never be processed; dead-letter it and move on
    #[error("terminal: {0}")]
    Terminal(String),

    /// A dependency hiccuped; abort without committing so the frame is redelivered
    #[error("transient: {0}")]
    Transient(String),
}

/// A received frame with its position in the log
#[derive(Debug, Clone)]
pub struct IncomingFrame {
    pub payload: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
}

impl IncomingFrame {
    /// Deserialize the payload as JSON; failure is a producer bug, so terminal
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, HandleError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| HandleError::Terminal(format!("decode failure: {e}")))
    }
}

/// Handler trait for processing frames
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// Process a single frame
    async fn handle(&self, frame: IncomingFrame) -> Result<(), HandleError>;
}

/// High-level Kafka consumer wrapper, one per (topic, partition set)
pub struct ContentConsumer {
    consumer: StreamConsumer,
    topic: String,
    max_frame_bytes: usize,
    shutdown_tx: broadcast::Sender<()>,
    dead_letter: Option<Arc<ContentProducer>>,
}

impl ContentConsumer {
    /// Create a consumer subscribed to the given topic
    pub fn new(
        config: &KafkaConfig,
        topic: &str,
        max_frame_bytes: usize,
    ) -> Result<Self, ConsumerError> {
        info!(
            brokers = %config.bootstrap_servers(),
            group = %config.group_id,
            topic,
            "Creating Kafka consumer"
        );

        let consumer: StreamConsumer = config
            .build_consumer_config()
            .create()
            .map_err(|e| ConsumerError::CreationError(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| ConsumerError::SubscriptionError {
                topic: topic.to_string(),
                message: e.to_string(),
            })?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            max_frame_bytes,
            shutdown_tx,
            dead_letter: None,
        })
    }

    /// Route terminal frames to the dead-letter topic through this producer
    pub fn with_dead_letter_producer(mut self, producer: Arc<ContentProducer>) -> Self {
        self.dead_letter = Some(producer);
        self
    }

    /// Signal the run loop to stop after the in-flight frame
    pub fn shutdown(&self) {
        info!(topic = %self.topic, "Signaling consumer shutdown");
        let _ = self.shutdown_tx.send(());
    }

    /// Consume frames and process them with the given handler
    ///
    /// Returns `Ok(())` on shutdown, or the transient error that aborted the
    /// loop. Either way the last committed offset marks the resume point.
    #[instrument(skip(self, handler), fields(topic = %self.topic))]
    pub async fn run<H: FrameHandler>(&self, handler: Arc<H>) -> Result<(), ConsumerError> {
        use tokio_stream::StreamExt;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let stream = self.consumer.stream();
        tokio::pin!(stream);

        info!("Starting frame consumption loop");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                message_result = stream.next() => {
                    match message_result {
                        Some(Ok(message)) => {
                            if let Err(e) = self.process_frame(&message, handler.as_ref()).await {
                                return Err(e);
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            metrics::counter!("pipeline.kafka.errors").increment(1);
                        }
                        None => {
                            debug!("Stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn process_frame<H: FrameHandler>(
        &self,
        message: &BorrowedMessage<'_>,
        handler: &H,
    ) -> Result<(), ConsumerError> {
        let payload = message.payload().unwrap_or(&[]);

        if payload.len() > self.max_frame_bytes {
            warn!(
                size_bytes = payload.len(),
                max_bytes = self.max_frame_bytes,
                partition = message.partition(),
                offset = message.offset(),
                "Frame exceeds size limit, dead-lettering"
            );
            self.dead_letter_frame(payload, "frame exceeds size limit")
                .await;
            metrics::counter!("pipeline.frames.oversize").increment(1);
            self.commit(message)?;
            return Ok(());
        }

        let frame = IncomingFrame {
            payload: payload.to_vec(),
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message
                .key()
                .and_then(|k| std::str::from_utf8(k).ok())
                .map(String::from),
        };

        debug!(
            partition = frame.partition,
            offset = frame.offset,
            "Received frame"
        );

        match handler.handle(frame).await {
            Ok(()) => {
                metrics::counter!("pipeline.frames.processed").increment(1);
                self.commit(message)
            }
            Err(HandleError::Terminal(reason)) => {
                error!(
                    reason = %reason,
                    partition = message.partition(),
                    offset = message.offset(),
                    "Dropping unprocessable frame"
                );
                self.dead_letter_frame(payload, &reason).await;
                metrics::counter!("pipeline.frames.dead_lettered").increment(1);
                self.commit(message)
            }
            Err(HandleError::Transient(reason)) => {
                error!(
                    reason = %reason,
                    partition = message.partition(),
                    offset = message.offset(),
                    "Transient failure, aborting without commit"
                );
                metrics::counter!("pipeline.frames.retried").increment(1);
                Err(ConsumerError::ProcessingError(reason))
            }
        }
    }

    async fn dead_letter_frame(&self, payload: &[u8], reason: &str) {
        if let Some(ref dlq) = self.dead_letter {
            if let Err(e) = dlq.send_to_dead_letter(&self.topic, payload, reason).await {
                error!(error = %e, "Failed to publish to dead-letter topic");
            }
        }
    }

    fn commit(&self, message: &BorrowedMessage<'_>) -> Result<(), ConsumerError> {
        self.consumer
            .commit_message(message, CommitMode::Async)
            .map_err(|e| ConsumerError::CommitError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_terminal_on_garbage() {
        let frame = IncomingFrame {
            payload: b"not json".to_vec(),
            topic: "content.text".to_string(),
            partition: 0,
            offset: 42,
            key: None,
        };

        let result: Result<serde_json::Value, _> = frame.decode_json();
        match result {
            Err(HandleError::Terminal(reason)) => assert!(reason.contains("decode failure")),
            other => panic!("expected terminal error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_json_round_trip() {
        let frame = IncomingFrame {
            payload: br#"{"answer": 42}"#.to_vec(),
            topic: "content.text".to_string(),
            partition: 1,
            offset: 7,
            key: Some("k".to_string()),
        };

        let value: serde_json::Value = frame.decode_json().unwrap();
        assert_eq!(value["answer"], 42);
    }
}
