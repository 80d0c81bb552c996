//! Core data structures shared by every tier of the translation chain

use crate::error::TranslateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default word count above which multi-word input is treated as a sentence
pub const DEFAULT_PHRASE_MAX_WORDS: usize = 5;

/// Kind of text being translated
///
/// Part of the cache key: the same surface text may translate differently as
/// a lone word and inside a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Word,
    Phrase,
    Sentence,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Word, Category::Phrase, Category::Sentence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Word => "word",
            Category::Phrase => "phrase",
            Category::Sentence => "sentence",
        }
    }

    /// Guess the category from the number of whitespace-separated words
    ///
    /// One word is a `Word`, up to `phrase_max_words` words a `Phrase`,
    /// anything longer a `Sentence`. Idioms longer than the threshold are
    /// classified as sentences.
    pub fn infer(text: &str, phrase_max_words: usize) -> Self {
        match word_count(text) {
            0 | 1 => Category::Word,
            n if n <= phrase_max_words => Category::Phrase,
            _ => Category::Sentence,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "word" => Ok(Category::Word),
            "phrase" => Ok(Category::Phrase),
            "sentence" => Ok(Category::Sentence),
            other => Err(TranslateError::Validation(format!(
                "Invalid translation category: {}. Must be word/phrase/sentence",
                other
            ))),
        }
    }
}

/// Which tier produced a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Dictionary,
    SecondaryDictionary,
    Neural,
    Cached,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Dictionary => "dictionary",
            Origin::SecondaryDictionary => "secondary-dictionary",
            Origin::Neural => "neural",
            Origin::Cached => "cached",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dictionary" => Ok(Origin::Dictionary),
            "secondary-dictionary" => Ok(Origin::SecondaryDictionary),
            "neural" => Ok(Origin::Neural),
            "cached" => Ok(Origin::Cached),
            other => Err(TranslateError::Validation(format!(
                "Invalid origin: {}. Must be dictionary/secondary-dictionary/neural/cached",
                other
            ))),
        }
    }
}

/// Outcome of one translation request
///
/// Success means `target_text` is present and `error` is absent; the
/// constructors only build those two shapes. `source` is `None` when the
/// request failed before any tier was consulted or after all of them missed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub source_text: String,
    pub target_text: Option<String>,
    #[serde(rename = "translation_type")]
    pub category: Category,
    #[serde(rename = "source")]
    pub origin: Option<Origin>,
    pub confidence_score: f64,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TranslationResult {
    pub fn success(
        source_text: &str,
        target_text: String,
        category: Category,
        origin: Origin,
        confidence_score: f64,
    ) -> Self {
        Self {
            source_text: source_text.to_string(),
            target_text: Some(target_text),
            category,
            origin: Some(origin),
            confidence_score: confidence_score.clamp(0.0, 1.0),
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn failure(
        source_text: &str,
        category: Category,
        origin: Option<Origin>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.to_string(),
            target_text: None,
            category,
            origin,
            confidence_score: 0.0,
            error: Some(error.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.target_text.is_some() && self.error.is_none()
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Category Tests ==========

    #[test]
    fn test_infer_category_by_word_count() {
        assert_eq!(Category::infer("hello", 5), Category::Word);
        assert_eq!(Category::infer("  hello  ", 5), Category::Word);
        assert_eq!(Category::infer("run out", 5), Category::Phrase);
        assert_eq!(Category::infer("one two three four five", 5), Category::Phrase);
        assert_eq!(
            Category::infer("an utterly unknown neologism xyzzy123 here", 5),
            Category::Sentence
        );
    }

    #[test]
    fn test_infer_respects_threshold() {
        assert_eq!(Category::infer("one two three", 2), Category::Sentence);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("Word".parse::<Category>().unwrap(), Category::Word);
        assert_eq!(" sentence ".parse::<Category>().unwrap(), Category::Sentence);
        assert!("paragraph".parse::<Category>().is_err());
    }

    // ========== Origin Tests ==========

    #[test]
    fn test_origin_serde_names() {
        assert_eq!(
            serde_json::to_string(&Origin::SecondaryDictionary).unwrap(),
            "\"secondary-dictionary\""
        );
        assert_eq!(
            serde_json::from_str::<Origin>("\"cached\"").unwrap(),
            Origin::Cached
        );
        assert_eq!("neural".parse::<Origin>().unwrap(), Origin::Neural);
        assert!("argos".parse::<Origin>().is_err());
    }

    // ========== Result Tests ==========

    #[test]
    fn test_success_shape() {
        let result = TranslationResult::success("hello", "你好".into(), Category::Word, Origin::Dictionary, 0.95);
        assert!(result.is_success());
        assert_eq!(result.error, None);
        assert_eq!(result.origin, Some(Origin::Dictionary));
    }

    #[test]
    fn test_failure_shape() {
        let result = TranslationResult::failure("xyz", Category::Word, None, "all translation sources failed");
        assert!(!result.is_success());
        assert_eq!(result.target_text, None);
        assert_eq!(result.confidence_score, 0.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let result = TranslationResult::success("a", "一".into(), Category::Word, Origin::Neural, 1.4);
        assert_eq!(result.confidence_score, 1.0);
    }

    #[test]
    fn test_result_json_field_names() {
        let result = TranslationResult::success("hello", "你好".into(), Category::Word, Origin::Cached, 0.95)
            .with_metadata("original_source", "dictionary");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["translation_type"], "word");
        assert_eq!(json["source"], "cached");
        assert_eq!(json["metadata"]["original_source"], "dictionary");
        assert!(json["error"].is_null());
    }
}
