use thiserror::Error;
use vocab_lexicon::LexiconError;

/// Error types for the translation module
///
/// Inside the fallback chain these are converted to data (a miss or a
/// failed [`TranslationResult`](crate::TranslationResult)). Only validation
/// errors from explicit cache writes, and configuration or I/O errors at
/// startup, reach callers.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Bad input to an explicit write such as `TranslationCache::set`
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration file missing required shape or holding bad values
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Dictionary error: {0}")]
    Lexicon(#[from] LexiconError),

    /// The neural engine could not be made ready
    #[error("Model load error: {0}")]
    EngineLoad(String),

    /// The neural engine was ready but the call failed
    #[error("Translation error: {0}")]
    Engine(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Result type for translation operations
pub type TranslateResult<T> = Result<T, TranslateError>;
