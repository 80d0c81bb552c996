//! Translation settings loaded from a TOML file
//!
//! Every section and field has a default, so a config file only needs the
//! values it changes:
//!
//! ```toml
//! [cache]
//! file_path = "data/translation_cache.json"
//! expiry_days = 14
//!
//! [secondary]
//! dictionaries_dir = "data/dictionaries"
//! priorities = [{ pattern = "oald", priority = 1 }, { pattern = "collins", priority = 2 }]
//!
//! [neural]
//! base_url = "http://127.0.0.1:5000"
//! timeout_ms = 8000
//! ```

use crate::data::{Category, DEFAULT_PHRASE_MAX_WORDS};
use crate::error::{TranslateError, TranslateResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vocab_lexicon::{PriorityRule, PriorityTable};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub cache: CacheConfig,
    pub dictionary: DictionaryConfig,
    pub secondary: SecondaryConfig,
    pub neural: NeuralConfig,
    pub chain: ChainConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub file_path: PathBuf,
    pub expiry_days: u32,
    /// Seconds between saves made by `TranslationChain::spawn_auto_save`; 0 disables
    pub auto_save_interval_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_path: PathBuf::from("data/translation_cache.json"),
            expiry_days: 30,
            auto_save_interval_secs: 300,
            max_entries: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    pub enabled: bool,
    pub vocabulary_file: PathBuf,
    pub confidence_score: f64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vocabulary_file: PathBuf::from("data/dictionaries/ECDICT/ecdict.csv"),
            confidence_score: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    pub enabled: bool,
    pub dictionaries_dir: PathBuf,
    pub extensions: Vec<String>,
    pub confidence_score: f64,
    /// Checked in order; the first pattern found in a file name wins
    pub priorities: Vec<PriorityRule>,
    pub default_priority: u32,
}

impl SecondaryConfig {
    pub fn priority_table(&self) -> PriorityTable {
        PriorityTable::new(self.priorities.clone(), self.default_priority)
    }
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dictionaries_dir: PathBuf::from("data/dictionaries"),
            extensions: vec!["json".to_string(), "tsv".to_string()],
            confidence_score: 0.90,
            priorities: vec![
                PriorityRule::new("oald", 1),
                PriorityRule::new("ldoce", 2),
                PriorityRule::new("collins", 3),
            ],
            default_priority: 5,
        }
    }
}

/// Maximum input length in characters for each category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthLimits {
    pub word: usize,
    pub phrase: usize,
    pub sentence: usize,
}

impl LengthLimits {
    pub fn for_category(&self, category: Category) -> usize {
        match category {
            Category::Word => self.word,
            Category::Phrase => self.phrase,
            Category::Sentence => self.sentence,
        }
    }
}

impl Default for LengthLimits {
    fn default() -> Self {
        Self {
            word: 100,
            phrase: 500,
            sentence: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfidence {
    pub base: f64,
    /// Added for single-word input in the `word` category
    pub word_bonus: f64,
    /// Subtracted for sentences above `long_sentence_threshold` words
    pub long_sentence_penalty: f64,
    pub long_sentence_floor: f64,
}

impl Default for NeuralConfidence {
    fn default() -> Self {
        Self {
            base: 0.70,
            word_bonus: 0.05,
            long_sentence_penalty: 0.10,
            long_sentence_floor: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    pub enabled: bool,
    pub base_url: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Per-call deadline for the engine; 0 waits indefinitely
    pub timeout_ms: u64,
    pub limits: LengthLimits,
    pub confidence: NeuralConfidence,
    pub long_sentence_threshold: usize,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://127.0.0.1:5000".to_string(),
            source_lang: "en".to_string(),
            target_lang: "zh".to_string(),
            timeout_ms: 5000,
            limits: LengthLimits::default(),
            confidence: NeuralConfidence::default(),
            long_sentence_threshold: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Inputs with more words than this are inferred to be sentences
    pub phrase_max_words: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            phrase_max_words: DEFAULT_PHRASE_MAX_WORDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log cache hits at info instead of debug
    pub log_cache_hits: bool,
    /// Log every successful translation at info
    pub log_translations: bool,
}

impl TranslationConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist
    ///
    /// # Errors
    /// - The file exists but cannot be read
    /// - The file is not valid TOML or has fields of the wrong type
    /// - A value is out of range (see [`validate`](Self::validate))
    pub fn load(path: &Path) -> TranslateResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslateError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded translation configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> TranslateResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TranslateError::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TranslateResult<()> {
        let confidences = [
            ("dictionary.confidence_score", self.dictionary.confidence_score),
            ("secondary.confidence_score", self.secondary.confidence_score),
            ("neural.confidence.base", self.neural.confidence.base),
            ("neural.confidence.long_sentence_floor", self.neural.confidence.long_sentence_floor),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(TranslateError::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if self.cache.expiry_days == 0 {
            return Err(TranslateError::Config(
                "cache.expiry_days must be at least 1".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(TranslateError::Config(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }

        let limits = self.neural.limits;
        if limits.word == 0 || limits.phrase == 0 || limits.sentence == 0 {
            return Err(TranslateError::Config(
                "neural.limits must all be greater than zero".to_string(),
            ));
        }

        if self.chain.phrase_max_words < 2 {
            return Err(TranslateError::Config(
                "chain.phrase_max_words must be at least 2".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = include_str!("../../config/translation.toml");
        let config = TranslationConfig::from_toml_str(shipped).unwrap();
        assert_eq!(config, TranslationConfig::default());
    }

    #[test]
    fn test_defaults() {
        let config = TranslationConfig::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.expiry_days, 30);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.dictionary.confidence_score, 0.95);
        assert_eq!(config.secondary.confidence_score, 0.90);
        assert_eq!(config.neural.limits.for_category(Category::Word), 100);
        assert_eq!(config.neural.limits.for_category(Category::Sentence), 2000);
        assert_eq!(config.chain.phrase_max_words, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = TranslationConfig::from_toml_str(
            r#"
            [cache]
            expiry_days = 7

            [neural.limits]
            word = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.expiry_days, 7);
        assert!(config.cache.enabled);
        assert_eq!(config.neural.limits.word, 50);
        assert_eq!(config.neural.limits.phrase, 500);
        assert_eq!(config.neural.target_lang, "zh");
    }

    #[test]
    fn test_priority_rules_from_toml() {
        let config = TranslationConfig::from_toml_str(
            r#"
            [secondary]
            priorities = [{ pattern = "collins", priority = 1 }]
            default_priority = 9
            "#,
        )
        .unwrap();
        let table = config.secondary.priority_table();
        assert_eq!(table.priority_for("Collins5"), 1);
        assert_eq!(table.priority_for("oald"), 9);
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let result = TranslationConfig::from_toml_str("[dictionary]\nconfidence_score = 1.5\n");
        assert!(matches!(result, Err(TranslateError::Config(msg)) if msg.contains("dictionary")));
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let result = TranslationConfig::from_toml_str("[cache]\nexpiry_days = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let result = TranslationConfig::from_toml_str("[cache]\nenabled = \"yes\"\n");
        assert!(matches!(result, Err(TranslateError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = TranslationConfig::load(Path::new("/nonexistent/translation.toml")).unwrap();
        assert_eq!(config, TranslationConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translation.toml");
        std::fs::write(&path, "[neural]\ntimeout_ms = 0\n").unwrap();
        let config = TranslationConfig::load(&path).unwrap();
        assert_eq!(config.neural.timeout_ms, 0);
    }
}
