//! Worker loop: raw image uploads in, NSFW-scored messages out.

use crate::classifier::{NsfwClassifier, NSFW_THRESHOLD};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sift_pipeline::consumer::{async_trait, FrameHandler, HandleError, IncomingFrame};
use sift_pipeline::messages::{ImageIngressMessage, ImageScoredMessage};
use sift_pipeline::ContentProducer;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ScoringWorker<C: NsfwClassifier> {
    classifier: C,
    producer: Arc<ContentProducer>,
    scored_topic: String,
}

impl<C: NsfwClassifier> ScoringWorker<C> {
    pub fn new(classifier: C, producer: Arc<ContentProducer>, scored_topic: String) -> Self {
        Self {
            classifier,
            producer,
            scored_topic,
        }
    }
}

#[async_trait]
impl<C: NsfwClassifier> FrameHandler for ScoringWorker<C> {
    async fn handle(&self, frame: IncomingFrame) -> Result<(), HandleError> {
        let message: ImageIngressMessage = frame.decode_json()?;

        // Bad base64 is a producer bug, not a retryable condition
        let image = BASE64
            .decode(&message.data)
            .map_err(|e| HandleError::Terminal(format!("can't decode image: {e}")))?;

        debug!(content_id = %message.id, size_bytes = image.len(), "Scoring image");

        let nsfw_scores = self.classifier.score(&image);
        let is_nsfw = nsfw_scores.explicit() > NSFW_THRESHOLD;

        let out = ImageScoredMessage {
            id: message.id,
            user_id: message.user_id,
            data: message.data,
            nsfw_scores,
            is_nsfw,
        };

        self.producer
            .send_json(&self.scored_topic, &out.id.to_string(), &out)
            .await
            .map_err(|e| HandleError::Transient(format!("scored publish: {e}")))?;

        info!(content_id = %out.id, is_nsfw, "Image scored");
        metrics::counter!("analyzer.images.processed").increment(1);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_pipeline::messages::NsfwScores;

    struct FixedClassifier(NsfwScores);

    impl NsfwClassifier for FixedClassifier {
        fn score(&self, _image: &[u8]) -> NsfwScores {
            self.0
        }
    }

    #[test]
    fn test_nsfw_flag_follows_threshold() {
        let explicit = NsfwScores {
            drawings: 0.0,
            hentai: 0.3,
            neutral: 0.1,
            porn: 0.4,
            sexy: 0.2,
        };
        assert!(explicit.explicit() > NSFW_THRESHOLD);

        let tame = NsfwScores {
            drawings: 0.1,
            hentai: 0.0,
            neutral: 0.85,
            porn: 0.03,
            sexy: 0.02,
        };
        assert!(tame.explicit() < NSFW_THRESHOLD);
    }

    #[test]
    fn test_base64_passthrough() {
        let data = BASE64.encode(b"image bytes");
        let ingress: ImageIngressMessage = serde_json::from_value(serde_json::json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "user_id": "u1",
            "type": "image",
            "data": data,
            "data_type": "image/png"
        }))
        .unwrap();

        let decoded = BASE64.decode(&ingress.data).unwrap();
        assert_eq!(decoded, b"image bytes");

        // the scored message carries the original base64, not the raw bytes
        let scores = FixedClassifier(NsfwScores {
            drawings: 0.0,
            hentai: 0.0,
            neutral: 1.0,
            porn: 0.0,
            sexy: 0.0,
        })
        .score(&decoded);
        let out = ImageScoredMessage {
            id: ingress.id,
            user_id: ingress.user_id,
            data: ingress.data.clone(),
            nsfw_scores: scores,
            is_nsfw: false,
        };
        assert_eq!(out.data, data);
    }
}
