//! Neural translator adapter
//!
//! Wraps a [`TranslationEngine`] so that every failure, including a missing
//! model, an engine error, a panic or a timeout, comes back as a failed
//! [`TranslationResult`]. Nothing in here returns `Err` or unwinds to the
//! caller.
//!
//! Load state moves `Unloaded → Loading → Ready` or `Unloaded → Loading →
//! Failed`. `Failed` is retried on the next call; `Ready` is permanent.

use crate::config::NeuralConfig;
use crate::data::{Category, Origin, TranslationResult, word_count};
use crate::engine::TranslationEngine;
use crate::error::TranslateError;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Load state of the underlying model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    /// Last load attempt failed with this reason
    Failed(String),
}

/// Describe a panic payload captured by `catch_unwind` or a join handle
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn join_failure(err: JoinError) -> String {
    if err.is_panic() {
        format!("engine panicked: {}", panic_message(err.into_panic().as_ref()))
    } else {
        "engine task was cancelled".to_string()
    }
}

pub struct NeuralTranslator {
    engine: Arc<dyn TranslationEngine>,
    config: NeuralConfig,
    state: RwLock<ModelState>,
    /// Held for the whole of a load attempt so that concurrent first calls
    /// run `initialize` once
    load_guard: tokio::sync::Mutex<()>,
}

impl NeuralTranslator {
    pub fn new(engine: Arc<dyn TranslationEngine>, config: NeuralConfig) -> Self {
        Self {
            engine,
            config,
            state: RwLock::new(ModelState::Unloaded),
            load_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> ModelState {
        self.state.read().clone()
    }

    pub fn engine_name(&self) -> &str {
        self.engine.engine_name()
    }

    pub fn config(&self) -> &NeuralConfig {
        &self.config
    }

    /// Try to load the model (once) and report whether it is ready
    pub async fn is_available(&self) -> bool {
        self.config.enabled && self.ensure_loaded().await.is_ok()
    }

    async fn ensure_loaded(&self) -> Result<(), String> {
        if *self.state.read() == ModelState::Ready {
            return Ok(());
        }

        let _guard = self.load_guard.lock().await;
        if *self.state.read() == ModelState::Ready {
            return Ok(());
        }

        *self.state.write() = ModelState::Loading;
        info!(engine = self.engine.engine_name(), "Loading translation model");

        let engine = Arc::clone(&self.engine);
        let source = self.config.source_lang.clone();
        let target = self.config.target_lang.clone();
        let outcome = tokio::spawn(async move { engine.initialize(&source, &target).await }).await;

        let reason = match outcome {
            Ok(Ok(())) => {
                *self.state.write() = ModelState::Ready;
                info!(engine = self.engine.engine_name(), "Translation model ready");
                return Ok(());
            }
            Ok(Err(TranslateError::EngineLoad(reason))) => reason,
            Ok(Err(e)) => e.to_string(),
            Err(join_err) => join_failure(join_err),
        };

        warn!(engine = self.engine.engine_name(), reason = %reason, "Translation model failed to load");
        *self.state.write() = ModelState::Failed(reason.clone());
        Err(reason)
    }

    /// Translate `text`, never failing with `Err`
    pub async fn translate(&self, text: &str, category: Category) -> TranslationResult {
        let fail = |error: String| {
            TranslationResult::failure(text, category, Some(Origin::Neural), error)
        };

        if text.trim().is_empty() {
            return fail("empty text".to_string());
        }

        if !self.config.enabled {
            return fail("neural translation is disabled".to_string());
        }

        let limit = self.config.limits.for_category(category);
        if text.chars().count() > limit {
            debug!(limit, category = %category, "Text too long for neural tier");
            return fail(format!(
                "text exceeds {} character limit for {}",
                limit, category
            ));
        }

        if let Err(reason) = self.ensure_loaded().await {
            return fail(reason);
        }

        let engine = Arc::clone(&self.engine);
        let owned = text.to_string();
        let source = self.config.source_lang.clone();
        let target = self.config.target_lang.clone();
        let handle =
            tokio::spawn(async move { engine.translate(&owned, &source, &target).await });

        let joined = if self.config.timeout_ms > 0 {
            let abort = handle.abort_handle();
            match tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), handle).await
            {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    warn!(timeout_ms = self.config.timeout_ms, "Neural translation timed out");
                    return fail(format!(
                        "translation timed out after {} ms",
                        self.config.timeout_ms
                    ));
                }
            }
        } else {
            handle.await
        };

        let translated = match joined {
            Ok(Ok(translated)) => translated,
            Ok(Err(e)) => {
                warn!(error = %e, "Neural translation failed");
                return fail(e.to_string());
            }
            Err(join_err) => {
                let reason = join_failure(join_err);
                warn!(reason = %reason, "Neural engine fault");
                return fail(reason);
            }
        };

        let translated = translated.trim();
        if translated.is_empty() {
            return fail("translation returned empty result".to_string());
        }

        TranslationResult::success(
            text,
            translated.to_string(),
            category,
            Origin::Neural,
            self.confidence_for(text, category),
        )
        .with_metadata("engine", self.engine.engine_name())
    }

    fn confidence_for(&self, text: &str, category: Category) -> f64 {
        let c = &self.config.confidence;
        let words = word_count(text);
        let score = match category {
            Category::Word if words == 1 => c.base + c.word_bonus,
            Category::Sentence if words > self.config.long_sentence_threshold => {
                (c.base - c.long_sentence_penalty).max(c.long_sentence_floor)
            }
            _ => c.base,
        };
        score.clamp(0.0, 1.0)
    }
}

impl std::fmt::Debug for NeuralTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeuralTranslator")
            .field("engine", &self.engine.engine_name())
            .field("state", &*self.state.read())
            .field("source_lang", &self.config.source_lang)
            .field("target_lang", &self.config.target_lang)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEngine, MockMode};

    fn translator(engine: Arc<MockEngine>) -> NeuralTranslator {
        NeuralTranslator::new(engine, NeuralConfig::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ========== Input Gating Tests ==========

    #[tokio::test]
    async fn test_empty_text_skips_load() {
        let engine = Arc::new(MockEngine::new(MockMode::Suffix));
        let neural = translator(engine.clone());

        let result = neural.translate("   ", Category::Word).await;
        assert_eq!(result.error.as_deref(), Some("empty text"));
        assert_eq!(engine.init_calls(), 0);
        assert_eq!(neural.state(), ModelState::Unloaded);
    }

    #[tokio::test]
    async fn test_length_limit_by_category() {
        let engine = Arc::new(MockEngine::new(MockMode::Suffix));
        let neural = translator(engine.clone());
        let text = "a".repeat(600);

        let rejected = neural.translate(&text, Category::Word).await;
        assert!(!rejected.is_success());
        assert_eq!(
            rejected.error.as_deref(),
            Some("text exceeds 100 character limit for word")
        );
        assert_eq!(engine.init_calls(), 0);
        assert_eq!(engine.translate_calls(), 0);

        let accepted = neural.translate(&text, Category::Sentence).await;
        assert!(accepted.is_success());
        assert_eq!(engine.translate_calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_never_loads() {
        let engine = Arc::new(MockEngine::new(MockMode::Suffix));
        let config = NeuralConfig {
            enabled: false,
            ..NeuralConfig::default()
        };
        let neural = NeuralTranslator::new(engine.clone(), config);

        assert!(!neural.translate("hello", Category::Word).await.is_success());
        assert!(!neural.is_available().await);
        assert_eq!(engine.init_calls(), 0);
    }

    // ========== Load State Tests ==========

    #[tokio::test]
    async fn test_model_loads_once() {
        let engine = Arc::new(MockEngine::new(MockMode::Suffix));
        let neural = translator(engine.clone());
        assert_eq!(neural.state(), ModelState::Unloaded);

        let first = neural.translate("hello", Category::Word).await;
        let second = neural.translate("world", Category::Word).await;
        assert_eq!(first.target_text.as_deref(), Some("hello_zh"));
        assert_eq!(second.target_text.as_deref(), Some("world_zh"));
        assert_eq!(first.origin, Some(Origin::Neural));
        assert_eq!(first.metadata["engine"], "Mock Engine");

        assert_eq!(engine.init_calls(), 1);
        assert_eq!(neural.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_failed_load_is_reported_and_retried() {
        let engine = Arc::new(MockEngine::new(MockMode::Suffix).failing_init("model not installed"));
        let neural = translator(engine.clone());

        let result = neural.translate("hello", Category::Word).await;
        assert_eq!(result.error.as_deref(), Some("model not installed"));
        assert_eq!(
            neural.state(),
            ModelState::Failed("model not installed".to_string())
        );

        neural.translate("hello", Category::Word).await;
        assert_eq!(engine.init_calls(), 2);
        assert_eq!(engine.translate_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_load_once() {
        let engine = Arc::new(MockEngine::new(MockMode::Suffix));
        let neural = Arc::new(translator(engine.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let neural = Arc::clone(&neural);
                tokio::spawn(async move { neural.translate(&format!("w{}", i), Category::Word).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_success());
        }

        assert_eq!(engine.init_calls(), 1);
        assert_eq!(engine.translate_calls(), 8);
    }

    #[tokio::test]
    async fn test_is_available() {
        let ok = translator(Arc::new(MockEngine::new(MockMode::Suffix)));
        assert!(ok.is_available().await);

        let broken = translator(Arc::new(MockEngine::new(MockMode::Suffix).failing_init("no model")));
        assert!(!broken.is_available().await);
    }

    // ========== Engine Failure Tests ==========

    #[tokio::test]
    async fn test_empty_engine_output_is_failure() {
        let neural = translator(Arc::new(MockEngine::new(MockMode::Empty)));
        let result = neural.translate("hello", Category::Word).await;
        assert_eq!(
            result.error.as_deref(),
            Some("translation returned empty result")
        );
        assert!(result.target_text.is_none());
    }

    #[tokio::test]
    async fn test_engine_error_is_failure() {
        let neural = translator(Arc::new(MockEngine::new(MockMode::Error(
            "out of memory".to_string(),
        ))));
        let result = neural.translate("hello", Category::Word).await;
        assert!(result.error.unwrap().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_engine_panic_is_failure() {
        let neural = translator(Arc::new(MockEngine::new(MockMode::Panic(
            "tensor shape mismatch".to_string(),
        ))));
        let result = neural.translate("hello", Category::Word).await;
        let error = result.error.unwrap();
        assert!(error.contains("panicked"));
        assert!(error.contains("tensor shape mismatch"));
        assert_eq!(neural.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let config = NeuralConfig {
            timeout_ms: 20,
            ..NeuralConfig::default()
        };
        let neural =
            NeuralTranslator::new(Arc::new(MockEngine::with_delay(MockMode::Suffix, 500)), config);
        let result = neural.translate("hello", Category::Word).await;
        assert_eq!(
            result.error.as_deref(),
            Some("translation timed out after 20 ms")
        );
    }

    #[tokio::test]
    async fn test_zero_timeout_waits() {
        let config = NeuralConfig {
            timeout_ms: 0,
            ..NeuralConfig::default()
        };
        let neural =
            NeuralTranslator::new(Arc::new(MockEngine::with_delay(MockMode::Suffix, 30)), config);
        assert!(neural.translate("hello", Category::Word).await.is_success());
    }

    // ========== Confidence Tests ==========

    #[tokio::test]
    async fn test_confidence_heuristic() {
        let neural = translator(Arc::new(MockEngine::new(MockMode::Suffix)));

        let word = neural.translate("hello", Category::Word).await;
        assert!(approx(word.confidence_score, 0.75));

        let phrase = neural.translate("run out of", Category::Phrase).await;
        assert!(approx(phrase.confidence_score, 0.70));

        let short = neural
            .translate("the cat sat on the mat today", Category::Sentence)
            .await;
        assert!(approx(short.confidence_score, 0.70));

        let long_text = vec!["word"; 25].join(" ");
        let long = neural.translate(&long_text, Category::Sentence).await;
        assert!(approx(long.confidence_score, 0.60));
    }

    #[tokio::test]
    async fn test_confidence_floor() {
        let mut config = NeuralConfig::default();
        config.confidence.long_sentence_penalty = 0.5;
        let neural = NeuralTranslator::new(Arc::new(MockEngine::new(MockMode::Suffix)), config);

        let long_text = vec!["word"; 30].join(" ");
        let result = neural.translate(&long_text, Category::Sentence).await;
        assert!(approx(result.confidence_score, 0.5));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
