//! LibreTranslate engine for offline neural translation
//!
//! LibreTranslate serves Argos Translate models over HTTP. Run it locally
//! with the English→Chinese package installed and this engine talks to it
//! without any data leaving the machine.
//!
//! # Configuration
//!
//! The server address comes from `neural.base_url`, overridden by the
//! `LIBRETRANSLATE_URL` environment variable. A server started with
//! `--api-keys` also needs `LIBRETRANSLATE_API_KEY`.
//!
//! # Example
//!
//! ```ignore
//! use vocab_translate::{LibreTranslateEngine, TranslationEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = LibreTranslateEngine::from_env()?;
//!     engine.initialize("en", "zh").await?;
//!     println!("{}", engine.translate("take off", "en", "zh").await?);
//!     Ok(())
//! }
//! ```

use crate::config::NeuralConfig;
use crate::engine::{TranslationEngine, normalize_locale, validate_locale};
use crate::error::{TranslateError, TranslateResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const URL_ENV_VAR: &str = "LIBRETRANSLATE_URL";
pub const API_KEY_ENV_VAR: &str = "LIBRETRANSLATE_API_KEY";

const PROBE_TEXT: &str = "test";

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    code: String,
    #[serde(default)]
    targets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Client for a LibreTranslate server
#[derive(Clone)]
pub struct LibreTranslateEngine {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LibreTranslateEngine {
    /// Create an engine for the server at `base_url`
    ///
    /// # Errors
    ///
    /// `TranslateError::Config` if the URL is blank, `Network` if the HTTP
    /// client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> TranslateResult<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TranslateError::Config(
                "LibreTranslate URL cannot be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    /// Create an engine from `LIBRETRANSLATE_URL` and `LIBRETRANSLATE_API_KEY`
    pub fn from_env() -> TranslateResult<Self> {
        let base_url =
            std::env::var(URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, std::env::var(API_KEY_ENV_VAR).ok())
    }

    /// Create an engine from the `[neural]` section; the environment wins
    /// over the file
    pub fn from_config(config: &NeuralConfig) -> TranslateResult<Self> {
        let base_url = std::env::var(URL_ENV_VAR).unwrap_or_else(|_| config.base_url.clone());
        Self::new(base_url, std::env::var(API_KEY_ENV_VAR).ok())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_languages(&self) -> TranslateResult<Vec<LanguageInfo>> {
        let url = format!("{}/languages", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(TranslateError::EngineLoad(format!(
                "LibreTranslate /languages returned {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            TranslateError::EngineLoad(format!("Failed to parse language list: {}", e))
        })
    }

    async fn request_translation(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslateResult<String> {
        let url = format!("{}/translate", self.base_url);
        let mut body = json!({
            "q": text,
            "source": normalize_locale(source_lang),
            "target": normalize_locale(target_lang),
            "format": "text"
        });
        if let Some(key) = &self.api_key {
            body["api_key"] = json!(key);
        }

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(if status.is_client_error() {
                TranslateError::Config(format!("Server rejected request ({}): {}", status, error_text))
            } else {
                TranslateError::Engine(format!("Server error ({}): {}", status, error_text))
            });
        }

        let parsed: TranslateResponse = response.json().await.map_err(|e| {
            TranslateError::Engine(format!("Failed to parse translation response: {}", e))
        })?;

        Ok(parsed.translated_text)
    }
}

/// Whether `languages` offers `source` → `target`
fn supports_pair(languages: &[LanguageInfo], source: &str, target: &str) -> bool {
    let Some(from) = languages.iter().find(|lang| lang.code == source) else {
        return false;
    };
    if from.targets.is_empty() {
        // Older servers omit `targets`; every listed language pairs with every other.
        return languages.iter().any(|lang| lang.code == target);
    }
    from.targets.iter().any(|code| code == target)
}

impl std::fmt::Debug for LibreTranslateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibreTranslateEngine")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl TranslationEngine for LibreTranslateEngine {
    async fn initialize(&self, source_lang: &str, target_lang: &str) -> TranslateResult<()> {
        validate_locale(source_lang)?;
        validate_locale(target_lang)?;
        let source = normalize_locale(source_lang);
        let target = normalize_locale(target_lang);

        let languages = self.fetch_languages().await.map_err(|e| match e {
            TranslateError::Network(err) => TranslateError::EngineLoad(format!(
                "LibreTranslate server unreachable at {}: {}",
                self.base_url, err
            )),
            other => other,
        })?;
        debug!(count = languages.len(), "Fetched installed languages");

        if !supports_pair(&languages, &source, &target) {
            return Err(TranslateError::EngineLoad(format!(
                "Language pair {}→{} is not installed on {}",
                source, target, self.base_url
            )));
        }

        let probe = self
            .request_translation(PROBE_TEXT, &source, &target)
            .await
            .map_err(|e| TranslateError::EngineLoad(format!("Probe translation failed: {}", e)))?;
        if probe.trim().is_empty() {
            return Err(TranslateError::EngineLoad(
                "Probe translation returned empty result".to_string(),
            ));
        }

        info!(url = %self.base_url, source = %source, target = %target, "LibreTranslate engine ready");
        Ok(())
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslateResult<String> {
        validate_locale(source_lang)?;
        validate_locale(target_lang)?;

        if text.trim().is_empty() {
            return Ok(String::new());
        }

        self.request_translation(text, source_lang, target_lang).await
    }

    fn engine_name(&self) -> &str {
        "LibreTranslate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str, targets: &[&str]) -> LanguageInfo {
        LanguageInfo {
            code: code.to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    // ========== Initialization Tests ==========

    #[test]
    fn test_new_trims_trailing_slash() {
        let engine = LibreTranslateEngine::new("http://localhost:5000/", None).unwrap();
        assert_eq!(engine.base_url(), "http://localhost:5000");
        assert_eq!(engine.engine_name(), "LibreTranslate");
    }

    #[test]
    fn test_new_with_empty_url() {
        match LibreTranslateEngine::new("   ", None) {
            Err(TranslateError::Config(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_blank_api_key_is_dropped() {
        let engine =
            LibreTranslateEngine::new(DEFAULT_BASE_URL, Some("  ".to_string())).unwrap();
        assert!(engine.api_key.is_none());
    }

    // ========== Language Pair Tests ==========

    #[test]
    fn test_supports_pair_with_targets() {
        let languages = vec![lang("en", &["zh", "fr"]), lang("zh", &["en"])];
        assert!(supports_pair(&languages, "en", "zh"));
        assert!(!supports_pair(&languages, "en", "ja"));
        assert!(!supports_pair(&languages, "ja", "en"));
    }

    #[test]
    fn test_supports_pair_without_targets() {
        let languages = vec![lang("en", &[]), lang("zh", &[])];
        assert!(supports_pair(&languages, "en", "zh"));
        assert!(!supports_pair(&languages, "en", "de"));
    }

    #[test]
    fn test_language_list_parses() {
        let raw = r#"[{"code":"en","name":"English","targets":["zh"]},{"code":"zh","name":"Chinese"}]"#;
        let languages: Vec<LanguageInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(languages.len(), 2);
        assert!(languages[1].targets.is_empty());
    }

    // ========== Validation Tests ==========

    #[tokio::test]
    async fn test_translate_empty_text() {
        let engine = LibreTranslateEngine::new(DEFAULT_BASE_URL, None).unwrap();
        assert_eq!(engine.translate("  ", "en", "zh").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_translate_invalid_locale() {
        let engine = LibreTranslateEngine::new(DEFAULT_BASE_URL, None).unwrap();
        assert!(engine.translate("hello", "en", "zh#bad").await.is_err());
        assert!(engine.initialize("en@x", "zh").await.is_err());
    }

    #[tokio::test]
    async fn test_initialize_unreachable_server() {
        let engine = LibreTranslateEngine::new("http://127.0.0.1:1", None).unwrap();
        match engine.initialize("en", "zh").await {
            Err(TranslateError::EngineLoad(msg)) => assert!(msg.contains("unreachable")),
            other => panic!("Expected EngineLoad error, got {:?}", other),
        }
    }

    // ========== Debug Implementation Test ==========

    #[test]
    fn test_debug_output() {
        let engine =
            LibreTranslateEngine::new(DEFAULT_BASE_URL, Some("secret-key".to_string())).unwrap();
        let debug_str = format!("{:?}", engine);
        assert!(debug_str.contains("***"));
        assert!(!debug_str.contains("secret-key"));
    }

    // ========== Integration Tests (require a running server) ==========

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_real_server_translation() {
        let engine = LibreTranslateEngine::from_env().unwrap();
        engine.initialize("en", "zh").await.unwrap();
        let result = engine.translate("Hello", "en", "zh").await.unwrap();
        println!("Translation: Hello → {}", result);
        assert!(!result.is_empty());
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_real_server_missing_pair() {
        let engine = LibreTranslateEngine::from_env().unwrap();
        let result = engine.initialize("en", "xx").await;
        assert!(matches!(result, Err(TranslateError::EngineLoad(_))));
    }
}
