//! NSFW classification interface.
//!
//! The classifier interface is fixed by the pipeline's wire contract (five
//! category scores); the scorer behind it is pluggable. Production
//! deployments put a model-backed scorer here. [`HeuristicClassifier`] is a
//! deterministic stand-in that keys off cheap byte statistics so the
//! pipeline can run end to end without an inference runtime.

use sift_pipeline::messages::NsfwScores;

/// Threshold over the combined explicit-category score
pub const NSFW_THRESHOLD: f64 = 0.7;

/// A pure image scorer. Implementations must not perform I/O.
pub trait NsfwClassifier: Send + Sync {
    fn score(&self, image: &[u8]) -> NsfwScores;
}

/// Deterministic byte-statistics scorer
#[derive(Debug, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl NsfwClassifier for HeuristicClassifier {
    fn score(&self, image: &[u8]) -> NsfwScores {
        if image.is_empty() {
            return NsfwScores {
                drawings: 0.0,
                hentai: 0.0,
                neutral: 1.0,
                porn: 0.0,
                sexy: 0.0,
            };
        }

        // Mean byte value and a rough dispersion measure, both in [0, 1].
        // No real signal about image content, but stable across reruns of
        // the same bytes, which is what the tests and the idempotence of
        // the sink care about.
        let len = image.len() as f64;
        let mean = image.iter().map(|&b| b as f64).sum::<f64>() / len / 255.0;
        let dispersion = image
            .iter()
            .map(|&b| (b as f64 / 255.0 - mean).abs())
            .sum::<f64>()
            / len;

        let porn = (mean * dispersion).min(0.35);
        let sexy = (dispersion * 0.5).min(0.2);
        let hentai = (mean * 0.2).min(0.15);
        let drawings = ((1.0 - dispersion) * 0.3).min(0.3);
        let neutral = (1.0 - porn - sexy - hentai - drawings).max(0.0);

        NsfwScores {
            drawings,
            hentai,
            neutral,
            porn,
            sexy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(scores: &NsfwScores) {
        for (label, v) in [
            ("drawings", scores.drawings),
            ("hentai", scores.hentai),
            ("neutral", scores.neutral),
            ("porn", scores.porn),
            ("sexy", scores.sexy),
        ] {
            assert!((0.0..=1.0).contains(&v), "{label} out of range: {v}");
        }
    }

    #[test]
    fn test_scores_are_in_range() {
        let classifier = HeuristicClassifier::new();
        for image in [
            &[][..],
            &[0u8; 64][..],
            &[255u8; 64][..],
            b"\xFF\xD8\xFF\xE0 some jpeg-ish bytes \x00\x10\x80\xFF",
        ] {
            assert_valid(&classifier.score(image));
        }
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let classifier = HeuristicClassifier::new();
        let image = b"the same bytes in, the same scores out";

        let a = classifier.score(image);
        let b = classifier.score(image);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_image_is_neutral() {
        let scores = HeuristicClassifier::new().score(&[]);
        assert_eq!(scores.neutral, 1.0);
        assert!(scores.explicit() < NSFW_THRESHOLD);
    }

    #[test]
    fn test_scores_roughly_sum_to_one() {
        let scores = HeuristicClassifier::new().score(&[0x42; 256]);
        let sum = scores.drawings + scores.hentai + scores.neutral + scores.porn + scores.sexy;
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
