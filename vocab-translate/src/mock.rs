//! Mock translation engine for testing
//!
//! A deterministic, model-free engine for exercising the neural tier and the
//! fallback chain without a running translation server. It counts its calls
//! so tests can assert that a tier was or was not consulted.
//!
//! # Example
//!
//! ```ignore
//! use vocab_translate::{MockEngine, MockMode, TranslationEngine};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockEngine::new(MockMode::Suffix);
//!     let result = mock.translate("hello", "en", "zh").await.unwrap();
//!     assert_eq!(result, "hello_zh");
//! }
//! ```

use crate::engine::TranslationEngine;
use crate::error::{TranslateError, TranslateResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append target suffix: "hello" → "hello_zh"
    Suffix,

    /// Predefined text → translation pairs, falling back to `Suffix`
    Mappings(HashMap<String, String>),

    /// Return an empty string
    Empty,

    /// Return an engine error with this message
    Error(String),

    /// Panic inside `translate`
    Panic(String),
}

/// Mock engine that simulates model behavior
#[derive(Debug)]
pub struct MockEngine {
    mode: MockMode,
    /// Simulated latency per call, in milliseconds
    delay_ms: u64,
    init_error: Option<String>,
    init_calls: AtomicUsize,
    translate_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay_ms: 0,
            init_error: None,
            init_calls: AtomicUsize::new(0),
            translate_calls: AtomicUsize::new(0),
        }
    }

    /// Create a MockEngine whose `translate` sleeps before answering
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new(mode)
        }
    }

    /// Make every `initialize` call fail with `message`
    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.init_error = Some(message.into());
        self
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn apply_translation(&self, text: &str, target: &str) -> TranslateResult<String> {
        match &self.mode {
            MockMode::Suffix => Ok(format!("{}_{}", text, target)),
            MockMode::Mappings(map) => Ok(map
                .get(text)
                .cloned()
                .unwrap_or_else(|| format!("{}_{}", text, target))),
            MockMode::Empty => Ok(String::new()),
            MockMode::Error(msg) => Err(TranslateError::Engine(msg.clone())),
            MockMode::Panic(msg) => panic!("{}", msg),
        }
    }
}

#[async_trait]
impl TranslationEngine for MockEngine {
    async fn initialize(&self, _source_lang: &str, _target_lang: &str) -> TranslateResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(msg) => Err(TranslateError::EngineLoad(msg.clone())),
            None => Ok(()),
        }
    }

    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> TranslateResult<String> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;
        self.apply_translation(text, target_lang)
    }

    fn engine_name(&self) -> &str {
        "Mock Engine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Suffix Mode Tests ==========

    #[tokio::test]
    async fn test_suffix_translation() {
        let mock = MockEngine::new(MockMode::Suffix);
        let result = mock.translate("hello", "en", "zh").await.unwrap();
        assert_eq!(result, "hello_zh");
    }

    #[tokio::test]
    async fn test_suffix_different_targets() {
        let mock = MockEngine::new(MockMode::Suffix);
        assert_eq!(mock.translate("hi", "en", "zh").await.unwrap(), "hi_zh");
        assert_eq!(mock.translate("hi", "en", "ja").await.unwrap(), "hi_ja");
    }

    // ========== Mapping Mode Tests ==========

    #[tokio::test]
    async fn test_mapping_translation() {
        let mut map = HashMap::new();
        map.insert("look up".to_string(), "查找".to_string());
        let mock = MockEngine::new(MockMode::Mappings(map));
        assert_eq!(mock.translate("look up", "en", "zh").await.unwrap(), "查找");
    }

    #[tokio::test]
    async fn test_mapping_fallback_to_suffix() {
        let mock = MockEngine::new(MockMode::Mappings(HashMap::new()));
        let result = mock.translate("unknown", "en", "zh").await.unwrap();
        assert_eq!(result, "unknown_zh");
    }

    // ========== Failure Mode Tests ==========

    #[tokio::test]
    async fn test_empty_mode() {
        let mock = MockEngine::new(MockMode::Empty);
        assert_eq!(mock.translate("hello", "en", "zh").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_error_mode_returns_error() {
        let mock = MockEngine::new(MockMode::Error("model crashed".to_string()));
        match mock.translate("hello", "en", "zh").await {
            Err(TranslateError::Engine(msg)) => assert_eq!(msg, "model crashed"),
            _ => panic!("Expected Engine error"),
        }
    }

    #[tokio::test]
    #[should_panic(expected = "boom")]
    async fn test_panic_mode_panics() {
        let mock = MockEngine::new(MockMode::Panic("boom".to_string()));
        let _ = mock.translate("hello", "en", "zh").await;
    }

    #[tokio::test]
    async fn test_failing_init() {
        let mock = MockEngine::new(MockMode::Suffix).failing_init("model not installed");
        match mock.initialize("en", "zh").await {
            Err(TranslateError::EngineLoad(msg)) => assert_eq!(msg, "model not installed"),
            _ => panic!("Expected EngineLoad error"),
        }
    }

    // ========== Counter Tests ==========

    #[tokio::test]
    async fn test_call_counters() {
        let mock = MockEngine::new(MockMode::Suffix);
        assert_eq!(mock.init_calls(), 0);
        assert_eq!(mock.translate_calls(), 0);

        mock.initialize("en", "zh").await.unwrap();
        mock.translate("a", "en", "zh").await.unwrap();
        mock.translate("b", "en", "zh").await.unwrap();

        assert_eq!(mock.init_calls(), 1);
        assert_eq!(mock.translate_calls(), 2);
    }

    // ========== Delay Tests ==========

    #[tokio::test]
    async fn test_delay_adds_latency() {
        let mock = MockEngine::with_delay(MockMode::Suffix, 50);
        let start = std::time::Instant::now();
        let _ = mock.translate("hello", "en", "zh").await.unwrap();
        assert!(start.elapsed().as_millis() >= 50);
    }

    #[test]
    fn test_engine_name() {
        let mock = MockEngine::new(MockMode::Suffix);
        assert_eq!(mock.engine_name(), "Mock Engine");
    }
}
