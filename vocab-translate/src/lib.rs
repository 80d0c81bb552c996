//! English → Chinese translation for the vocabulary analyzer
//!
//! Lookups go through a fixed fallback chain, cheapest and most precise
//! source first:
//!
//! 1. persistent translation cache
//! 2. ECDICT dictionary index (single words)
//! 3. secondary dictionaries, in priority order
//! 4. an offline neural engine (LibreTranslate / Argos)
//!
//! Every success is written back to the cache. Failures never surface as
//! `Err`; they come back as a [`TranslationResult`] with an `error`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vocab_translate::{LibreTranslateEngine, TranslationChain, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TranslationConfig::load("config/translation.toml".as_ref())?;
//!     let engine = Arc::new(LibreTranslateEngine::from_config(&config.neural)?);
//!     let chain = TranslationChain::from_config(config, engine);
//!
//!     let result = chain.translate("hello", None).await;
//!     println!("{:?} via {:?}", result.target_text, result.origin);
//!
//!     chain.persist_cache()?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chain;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod libretranslate;
pub mod mock;
pub mod neural;


// Re-export main types for convenient access
pub use cache::{CacheEntry, CacheStats, TranslationCache, cache_key};
pub use chain::{ALL_SOURCES_FAILED, SourceAvailability, TranslationChain};
pub use config::{
    CacheConfig, ChainConfig, DictionaryConfig, LengthLimits, LoggingConfig, NeuralConfidence,
    NeuralConfig, SecondaryConfig, TranslationConfig,
};
pub use data::{Category, Origin, TranslationResult, word_count};
pub use engine::{TranslationEngine, normalize_locale, validate_locale};
pub use error::{TranslateError, TranslateResult};
pub use libretranslate::LibreTranslateEngine;
pub use mock::{MockEngine, MockMode};
pub use neural::{ModelState, NeuralTranslator};
