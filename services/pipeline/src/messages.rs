//! Wire message types exchanged over the pipeline topics.
//!
//! All topics carry UTF-8 JSON. Per-frame size limits are enforced by the
//! consumer before any decode is attempted; oversized frames go straight to
//! the dead-letter topic.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Largest frame accepted on the text topics
pub const TEXT_FRAME_MAX_BYTES: usize = 10 * 1024;

/// Largest frame accepted on the image-carrying topics
pub const IMAGE_FRAME_MAX_BYTES: usize = 2 * 1024 * 1024;

/// Kind of user-submitted content moving through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ContentType::Text),
            "image" => Some(ContentType::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway -> text analyzer, on the text topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextIngressMessage {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// The submitted text, verbatim
    pub data: String,
    /// MIME type of `data`
    pub data_type: String,
}

/// Gateway -> image analyzer, on the image uploads topic
///
/// Same shape as [`TextIngressMessage`]; `data` is the base64-encoded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageIngressMessage {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub data: String,
    pub data_type: String,
}

/// Verdict produced by a text analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub is_approved: bool,
    pub is_spam: bool,
    pub has_sensitive: bool,
    /// Bounded to [-1.0, 1.0]
    pub sentiment: f64,
    pub language: String,
}

/// Text analyzer -> storage sink, on the text results topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResultMessage {
    pub id: Uuid,
    /// The original text, passed through unchanged
    pub data: String,
    pub user_id: String,
    pub result: AnalysisResult,
}

/// Per-category NSFW scores produced by an image classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NsfwScores {
    pub drawings: f64,
    pub hentai: f64,
    pub neutral: f64,
    pub porn: f64,
    pub sexy: f64,
}

impl NsfwScores {
    /// Combined score of the explicit categories
    pub fn explicit(&self) -> f64 {
        self.hentai + self.porn + self.sexy
    }
}

/// Image analyzer -> storage sink, on the images topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageScoredMessage {
    pub id: Uuid,
    pub user_id: String,
    /// Base64-encoded image bytes, passed through unchanged
    pub data: String,
    pub nsfw_scores: NsfwScores,
    pub is_nsfw: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_ingress_wire_format() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "user_id": "u1",
            "type": "text",
            "data": "Hello world",
            "data_type": "text/plain"
        }"#;

        let msg: TextIngressMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content_type, ContentType::Text);
        assert_eq!(msg.data, "Hello world");

        let out = serde_json::to_value(&msg).unwrap();
        assert_eq!(out["type"], "text");
        assert_eq!(out["data_type"], "text/plain");
    }

    #[test]
    fn test_text_result_wire_format() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "data": "Hello world",
            "user_id": "u1",
            "result": {
                "is_approved": true,
                "is_spam": false,
                "has_sensitive": false,
                "sentiment": 0.1,
                "language": "en"
            }
        }"#;

        let msg: TextResultMessage = serde_json::from_str(json).unwrap();
        assert!(msg.result.is_approved);
        assert_eq!(msg.result.language, "en");
    }

    #[test]
    fn test_image_scored_wire_format() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "user_id": "u1",
            "data": "SGVsbG8=",
            "nsfw_scores": {
                "drawings": 0.1,
                "hentai": 0.0,
                "neutral": 0.8,
                "porn": 0.05,
                "sexy": 0.05
            },
            "is_nsfw": false
        }"#;

        let msg: ImageScoredMessage = serde_json::from_str(json).unwrap();
        assert!(!msg.is_nsfw);
        assert!((msg.nsfw_scores.explicit() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_content_type_round_trip() {
        assert_eq!(ContentType::parse("text"), Some(ContentType::Text));
        assert_eq!(ContentType::parse("image"), Some(ContentType::Image));
        assert_eq!(ContentType::parse("video"), None);
        assert_eq!(ContentType::Image.to_string(), "image");
    }

    #[test]
    fn test_frame_limits() {
        assert_eq!(TEXT_FRAME_MAX_BYTES, 10_240);
        assert_eq!(IMAGE_FRAME_MAX_BYTES, 2_097_152);
    }
}
