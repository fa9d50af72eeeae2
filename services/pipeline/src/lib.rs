//! Sift Pipeline - Kafka message transport for the content-moderation platform
//!
//! This library provides a high-level interface for producing and consuming
//! messages between the sift services. It handles:
//!
//! - Ingress messages carrying user-submitted text and images
//! - Analyzer result messages on the way to the storage sink
//! - Dead-letter routing for frames that cannot be processed
//!
//! # Example
//!
//! ```rust,no_run
//! use sift_pipeline::{ContentConsumer, ContentProducer, KafkaConfig};
//! use sift_pipeline::messages::TEXT_FRAME_MAX_BYTES;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = KafkaConfig::default();
//!     let producer = ContentProducer::new(&config)?;
//!
//!     let consumer =
//!         ContentConsumer::new(&config, &config.topics.text, TEXT_FRAME_MAX_BYTES)?;
//!
//!     let _ = (producer, consumer);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod messages;
pub mod producer;

// Re-export main types
pub use config::{ConfigError, KafkaConfig, TopicConfig};
pub use consumer::{
    async_trait, ConsumerError, ContentConsumer, FrameHandler, HandleError, IncomingFrame,
};
pub use messages::{
    AnalysisResult, ContentType, ImageIngressMessage, ImageScoredMessage, NsfwScores,
    TextIngressMessage, TextResultMessage,
};
pub use producer::{ContentProducer, DeliveryResult, OutgoingMessage, ProducerError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::KafkaConfig;
    pub use crate::consumer::{
        async_trait, ConsumerError, ContentConsumer, FrameHandler, HandleError, IncomingFrame,
    };
    pub use crate::messages::*;
    pub use crate::producer::{ContentProducer, OutgoingMessage, ProducerError};
}
