//! Worker loop: one frame in from the text topic, one result out to the
//! results topic.

use crate::analyzer::TextAnalyzer;
use sift_pipeline::consumer::{async_trait, FrameHandler, HandleError, IncomingFrame};
use sift_pipeline::messages::{TextIngressMessage, TextResultMessage};
use sift_pipeline::ContentProducer;
use std::sync::Arc;
use tracing::{debug, info};

pub struct AnalyzerWorker<A: TextAnalyzer> {
    analyzer: A,
    producer: Arc<ContentProducer>,
    results_topic: String,
}

impl<A: TextAnalyzer> AnalyzerWorker<A> {
    pub fn new(analyzer: A, producer: Arc<ContentProducer>, results_topic: String) -> Self {
        Self {
            analyzer,
            producer,
            results_topic,
        }
    }
}

#[async_trait]
impl<A: TextAnalyzer> FrameHandler for AnalyzerWorker<A> {
    async fn handle(&self, frame: IncomingFrame) -> Result<(), HandleError> {
        let message: TextIngressMessage = frame.decode_json()?;

        debug!(content_id = %message.id, "Analyzing text");

        let result = self.analyzer.analyze(&message.data);

        let out = TextResultMessage {
            id: message.id,
            data: message.data,
            user_id: message.user_id,
            result,
        };

        // A failed send aborts the loop; the supervisor restarts from the
        // last committed offset and the frame is re-analyzed
        self.producer
            .send_json(&self.results_topic, &out.id.to_string(), &out)
            .await
            .map_err(|e| HandleError::Transient(format!("result publish: {e}")))?;

        info!(
            content_id = %out.id,
            is_approved = out.result.is_approved,
            is_spam = out.result.is_spam,
            has_sensitive = out.result.has_sensitive,
            "Text analyzed"
        );
        metrics::counter!("analyzer.text.processed").increment(1);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_pipeline::messages::AnalysisResult;

    struct FixedAnalyzer;

    impl TextAnalyzer for FixedAnalyzer {
        fn analyze(&self, _text: &str) -> AnalysisResult {
            AnalysisResult {
                is_approved: true,
                is_spam: false,
                has_sensitive: false,
                sentiment: 0.1,
                language: "en".to_string(),
            }
        }
    }

    #[test]
    fn test_result_message_preserves_input() {
        let ingress: TextIngressMessage = serde_json::from_str(
            r#"{
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "user_id": "u1",
                "type": "text",
                "data": "Hello world",
                "data_type": "text/plain"
            }"#,
        )
        .unwrap();

        let result = FixedAnalyzer.analyze(&ingress.data);
        let out = TextResultMessage {
            id: ingress.id,
            data: ingress.data.clone(),
            user_id: ingress.user_id.clone(),
            result,
        };

        assert_eq!(out.id, ingress.id);
        assert_eq!(out.data, "Hello world");
        assert_eq!(out.user_id, "u1");

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["result"]["language"], "en");
    }
}
