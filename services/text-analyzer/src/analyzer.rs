//! Text classification rules.
//!
//! The analyzer interface is fixed; the ruleset behind it is pluggable.
//! [`BasicAnalyzer`] is the reference heuristic implementation: cheap
//! substring and character-class checks, no models, English and Russian
//! word lists.

use sift_pipeline::messages::AnalysisResult;
use std::collections::HashMap;

/// A pure text classifier. Implementations must not perform I/O.
pub trait TextAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> AnalysisResult;
}

/// Reference heuristic ruleset
#[derive(Debug, Default)]
pub struct BasicAnalyzer;

impl BasicAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl TextAnalyzer for BasicAnalyzer {
    fn analyze(&self, text: &str) -> AnalysisResult {
        let normalized = text.trim().to_lowercase();

        let mut is_spam = is_spam(&normalized);
        // The word list is matched against the raw text; the lists are
        // lowercase, so an all-caps slur deliberately does not trip this
        let has_sensitive = contains_sensitive(text);

        if uppercase_ratio(text) > 0.5 {
            is_spam = true;
        }

        AnalysisResult {
            is_approved: !is_spam && !has_sensitive,
            is_spam,
            has_sensitive,
            sentiment: calculate_sentiment(&normalized),
            language: detect_language(&normalized),
        }
    }
}

const SENSITIVE_WORDS: &[&str] = &[
    "bad", "sensitive", "dangerous", "hate", "violence", "attack", "kill", "bomb", "terror",
    "drugs", "weapon", "racist", "nazi", "hitler", "suicide", "murder", "rape", "pedo", "scam",
    "fraud",
    // Russian
    "опасный", "терроризм", "наркотики", "оружие", "насилие", "ненависть", "атака", "убийство",
    "мошенничество", "скам", "расизм", "нацизм", "изнасилование", "педофил", "суицид",
    // profanity
    "идиот", "дурак", "кретин", "retard", "fuck", "shit", "asshole", "мудак", "сволочь",
    "ублюдок",
];

const SPAM_PHRASES: &[&str] = &[
    "click here", "make money", "earn cash", "work from home", "limited offer",
    "special promotion", "buy now", "discount", "free gift", "win prize",
    "congratulations you won", "urgent", "only today", "click this link", "unsubscribe",
    "100% free", "risk free", "no cost", "no fees", "money back", "guarantee",
    "increase sales", "double your", "extra income", "home based", "be your own boss",
    // Russian
    "бесплатно", "быстрые деньги", "легкий заработок", "гарантированный доход",
    "криптовалюта бесплатно", "выиграй миллион", "деньги сразу", "быстрый кредит",
    "акция только сегодня", "успей до конца дня", "скидка 50%", "распродажа", "купи сейчас",
    "уникальный товар", "ваш аккаунт заблокирован", "срочно обновите данные",
    "нажмите чтобы получить", "кликните по ссылке", "срочное уведомление", "важная информация",
    "добавь в друзья", "подпишись и получи", "репостни чтобы выиграть",
    "знакомства без регистрации",
];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "awesome", "happy", "love", "лучший", "отлично", "прекрасно",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "hate", "awful", "angry", "плохо", "ужасно", "ненависть",
];

fn contains_sensitive(text: &str) -> bool {
    SENSITIVE_WORDS.iter().any(|word| text.contains(word))
}

fn is_spam(text: &str) -> bool {
    if text.contains("http://")
        || text.contains("https://")
        || text.contains(".com")
        || text.contains(".ru")
    {
        return true;
    }

    if SPAM_PHRASES.iter().any(|phrase| text.contains(phrase)) {
        return true;
    }

    // The same long token repeated over and over is a keyword-stuffing tell
    let mut word_count: HashMap<&str, u32> = HashMap::new();
    for word in text.split_whitespace() {
        if word.chars().count() > 3 {
            let count = word_count.entry(word).or_insert(0);
            *count += 1;
            if *count > 3 {
                return true;
            }
        }
    }

    false
}

fn detect_language(text: &str) -> String {
    if text
        .chars()
        .any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
    {
        "ru".to_string()
    } else {
        "en".to_string()
    }
}

/// Word-list sentiment, bounded to [-1.0, 1.0] with a slight positive base
fn calculate_sentiment(text: &str) -> f64 {
    let base = 0.1;

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return base;
    }

    let mut positive = 0i64;
    let mut negative = 0i64;

    for word in &words {
        if POSITIVE_WORDS.iter().any(|pw| word.contains(pw)) {
            positive += 1;
        }
        if NEGATIVE_WORDS.iter().any(|nw| word.contains(nw)) {
            negative += 1;
        }
    }

    let total = positive + negative;
    if total == 0 {
        return base;
    }

    let score = (positive - negative) as f64 / total as f64 + base;
    score.clamp(-1.0, 1.0)
}

fn uppercase_ratio(text: &str) -> f64 {
    let mut letters = 0u64;
    let mut uppercase = 0u64;

    for c in text.chars() {
        if c.is_alphabetic() {
            letters += 1;
            if c.is_uppercase() {
                uppercase += 1;
            }
        }
    }

    if letters == 0 {
        return 0.0;
    }

    uppercase as f64 / letters as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> AnalysisResult {
        BasicAnalyzer::new().analyze(text)
    }

    #[test]
    fn test_plain_text_is_approved() {
        let result = analyze("Hello world");
        assert!(result.is_approved);
        assert!(!result.is_spam);
        assert!(!result.has_sensitive);
        assert_eq!(result.language, "en");
    }

    #[test]
    fn test_sensitive_text_is_rejected() {
        let result = analyze("I hate everything");
        assert!(result.has_sensitive);
        assert!(!result.is_approved);
    }

    #[test]
    fn test_sensitive_match_is_case_sensitive() {
        // the raw text is matched against lowercase word lists
        assert!(!analyze("a BAD actor").has_sensitive);
        assert!(analyze("a bad actor").has_sensitive);
    }

    #[test]
    fn test_url_is_spam() {
        let result = analyze("visit http://x.com now");
        assert!(result.is_spam);
        assert!(!result.is_approved);
    }

    #[test]
    fn test_spam_phrase_is_spam() {
        assert!(analyze("make money fast, limited offer").is_spam);
        assert!(analyze("быстрые деньги без усилий").is_spam);
    }

    #[test]
    fn test_repeated_long_tokens_are_spam() {
        let result = analyze("winner winner winner winner tonight");
        assert!(result.is_spam);
    }

    #[test]
    fn test_short_repeated_tokens_are_not_spam() {
        // words of <= 3 chars don't count toward repetition
        let result = analyze("ha ha ha ha ha ha ha");
        assert!(!result.is_spam);
    }

    #[test]
    fn test_shouting_is_spam() {
        let result = analyze("BUY THESE AMAZING SHOES TODAY");
        assert!(result.is_spam);
    }

    #[test]
    fn test_cyrillic_detected_as_russian() {
        let result = analyze("привет, как дела");
        assert_eq!(result.language, "ru");
    }

    #[test]
    fn test_sentiment_is_bounded() {
        for text in [
            "love love great happy awesome",
            "terrible awful angry hate hate",
            "",
            "neutral words only here",
        ] {
            let sentiment = analyze(text).sentiment;
            assert!((-1.0..=1.0).contains(&sentiment), "out of range: {sentiment}");
        }
    }

    #[test]
    fn test_positive_text_scores_above_negative() {
        let positive = analyze("what a great and happy day").sentiment;
        let negative = analyze("a terrible and awful day").sentiment;
        assert!(positive > negative);
    }
}
