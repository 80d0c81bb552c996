//! Neural translation engine trait and locale helpers
//!
//! The `TranslationEngine` trait is the seam between the neural tier and
//! whatever actually runs the model: a local LibreTranslate server, or the
//! deterministic mock used in tests.
//!
//! # Example
//!
//! ```ignore
//! use vocab_translate::{LibreTranslateEngine, TranslationEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = LibreTranslateEngine::from_env()?;
//!     engine.initialize().await?;
//!
//!     let result = engine.translate("look up", "en", "zh").await?;
//!     println!("{}", result); // "查找"
//!
//!     Ok(())
//! }
//! ```

use crate::error::{TranslateError, TranslateResult};
use async_trait::async_trait;

/// Offline translation engine behind the neural tier
///
/// `initialize` is called once before the first `translate`. It may be slow
/// (a model load) and it may fail. The neural adapter never calls it twice
/// after a success.
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Make the engine ready for the given language pair
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The engine can translate `source_lang` → `target_lang`
    /// * `Err(TranslateError::EngineLoad)` - The model or a dependency is missing
    async fn initialize(&self, source_lang: &str, target_lang: &str) -> TranslateResult<()>;

    /// Translate a single text
    ///
    /// An empty string is a legal return value here; the adapter treats it
    /// as a failed translation.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslateResult<String>;

    /// Name used in logs and result metadata
    fn engine_name(&self) -> &str;
}

/// Reduce a BCP 47 tag to its language subtag
///
/// - `en-US` → `en`
/// - `zh-Hans` → `zh`
/// - `ZH` → `zh`
pub fn normalize_locale(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale)
        .to_lowercase()
}

/// Reject empty language codes and codes with characters outside
/// `[A-Za-z0-9_-]`
pub fn validate_locale(locale: &str) -> TranslateResult<()> {
    if locale.is_empty() {
        return Err(TranslateError::Config(
            "Language code is empty".to_string(),
        ));
    }

    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TranslateError::Config(format!(
            "Invalid characters in language code: {}",
            locale
        )));
    }

    Ok(())
}
