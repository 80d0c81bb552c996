//! Fallback chain orchestrator
//!
//! `translate` tries, in order:
//!
//! 1. the translation cache
//! 2. the dictionary index (single words only)
//! 3. the secondary dictionaries
//! 4. the neural translator
//!
//! and writes every success back to the cache. A tier that errors or panics
//! counts as a miss for that tier; the caller always gets a
//! [`TranslationResult`].
//!
//! Concurrent misses on the same text and category are serialized, so the
//! second caller is answered from the cache instead of querying every tier
//! again.
//!
//! Secondary dictionaries are opened lazily from disk, so their queries run
//! on tokio's blocking pool rather than on a runtime worker.

use crate::cache::{CacheStats, TranslationCache, cache_key};
use crate::config::TranslationConfig;
use crate::data::{Category, Origin, TranslationResult};
use crate::engine::TranslationEngine;
use crate::error::TranslateResult;
use crate::neural::{NeuralTranslator, panic_message};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vocab_lexicon::{DefinitionHit, DictionaryIndex, SecondaryDictionaries, WordEntry, WordLookup};

pub const ALL_SOURCES_FAILED: &str = "all translation sources failed";

/// Which tiers can currently answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceAvailability {
    pub cache: bool,
    pub dictionary: bool,
    pub secondary_dictionary: bool,
    pub neural: bool,
}

pub struct TranslationChain {
    config: TranslationConfig,
    cache: Arc<TranslationCache>,
    dictionary: Option<Arc<dyn WordLookup>>,
    secondary: Arc<SecondaryDictionaries>,
    neural: Arc<NeuralTranslator>,
    inflight: parking_lot::Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl TranslationChain {
    /// Assemble a chain from already-built tiers, with no dictionary index
    pub fn new(
        config: TranslationConfig,
        cache: Arc<TranslationCache>,
        secondary: Arc<SecondaryDictionaries>,
        neural: Arc<NeuralTranslator>,
    ) -> Self {
        Self {
            config,
            cache,
            dictionary: None,
            secondary,
            neural,
            inflight: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn with_dictionary(mut self, dictionary: Arc<dyn WordLookup>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Build every tier from configuration
    ///
    /// The cache file is loaded and the dictionaries directory scanned. A
    /// vocabulary file that cannot be read leaves the dictionary tier out
    /// with a warning; the rest of the chain still works.
    pub fn from_config(config: TranslationConfig, engine: Arc<dyn TranslationEngine>) -> Self {
        let cache = TranslationCache::from_config(&config.cache);
        if config.cache.enabled {
            cache.reload();
        }

        let secondary = SecondaryDictionaries::new(&config.secondary.dictionaries_dir)
            .with_extensions(&config.secondary.extensions)
            .with_priorities(config.secondary.priority_table());
        if config.secondary.enabled {
            secondary.discover();
        }

        let neural = NeuralTranslator::new(engine, config.neural.clone());

        let dictionary = if config.dictionary.enabled {
            match DictionaryIndex::from_csv_path(&config.dictionary.vocabulary_file) {
                Ok(index) => Some(Arc::new(index) as Arc<dyn WordLookup>),
                Err(e) => {
                    warn!(
                        path = %config.dictionary.vocabulary_file.display(),
                        error = %e,
                        "Dictionary index unavailable"
                    );
                    None
                }
            }
        } else {
            None
        };

        let mut chain = Self::new(config, Arc::new(cache), Arc::new(secondary), Arc::new(neural));
        chain.dictionary = dictionary;
        chain
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn secondary(&self) -> &SecondaryDictionaries {
        &self.secondary
    }

    pub fn neural(&self) -> &NeuralTranslator {
        &self.neural
    }

    /// Translate `text`, inferring the category from its word count when
    /// none is given
    pub async fn translate(&self, text: &str, category: Option<Category>) -> TranslationResult {
        let text = text.trim();
        let category = category
            .unwrap_or_else(|| Category::infer(text, self.config.chain.phrase_max_words));

        if text.is_empty() {
            return TranslationResult::failure(text, category, None, "empty text");
        }

        if let Some(hit) = self.cached(text, category) {
            return hit;
        }

        let result = if self.config.cache.enabled {
            let lock = self.flight_lock(&cache_key(text, category));
            let _turn = lock.lock().await;
            // Another caller may have filled the cache while we waited.
            match self.cached(text, category) {
                Some(hit) => hit,
                None => self.run_tiers(text, category).await,
            }
        } else {
            self.run_tiers(text, category).await
        };

        if self.config.logging.log_translations {
            info!(text = %text, category = %category, success = result.is_success(), origin = ?result.origin, "Translation finished");
        } else {
            debug!(text = %text, category = %category, success = result.is_success(), origin = ?result.origin, "Translation finished");
        }
        result
    }

    async fn run_tiers(&self, text: &str, category: Category) -> TranslationResult {
        if category == Category::Word
            && let Some(entry) = self.query_dictionary(text)
        {
            let level = entry.cefr_level();
            let result = TranslationResult::success(
                text,
                entry.translation,
                category,
                Origin::Dictionary,
                self.config.dictionary.confidence_score,
            )
            .with_metadata("pos", entry.pos)
            .with_metadata("phonetic", entry.phonetic)
            .with_metadata("collins", entry.collins)
            .with_metadata("oxford", entry.oxford)
            .with_metadata("level", level.as_str());
            self.remember(&result);
            return result;
        }

        if let Some(hit) = self.query_secondary(text).await {
            let result = TranslationResult::success(
                text,
                hit.definition,
                category,
                Origin::SecondaryDictionary,
                self.config.secondary.confidence_score,
            )
            .with_metadata("dictionary", hit.source_name)
            .with_metadata("priority", hit.priority);
            self.remember(&result);
            return result;
        }

        let neural_error = if self.config.neural.enabled {
            let result = self.neural.translate(text, category).await;
            if result.is_success() {
                self.remember(&result);
                return result;
            }
            debug!(error = ?result.error, "Neural tier missed");
            result.error
        } else {
            None
        };

        TranslationResult::failure(
            text,
            category,
            None,
            neural_error.unwrap_or_else(|| ALL_SOURCES_FAILED.to_string()),
        )
    }

    fn cached(&self, text: &str, category: Category) -> Option<TranslationResult> {
        if !self.config.cache.enabled {
            return None;
        }
        let entry = self.cache.get(text, category)?;

        if self.config.logging.log_cache_hits {
            info!(text = %text, category = %category, origin = %entry.origin, "Cache hit");
        } else {
            debug!(text = %text, category = %category, origin = %entry.origin, "Cache hit");
        }

        Some(
            TranslationResult::success(
                text,
                entry.target_text,
                category,
                Origin::Cached,
                entry.confidence_score,
            )
            .with_metadata("original_source", entry.origin.as_str())
            .with_metadata("access_count", entry.access_count),
        )
    }

    fn query_dictionary(&self, text: &str) -> Option<WordEntry> {
        if !self.config.dictionary.enabled {
            return None;
        }
        let index = self.dictionary.as_ref()?;

        match catch_unwind(AssertUnwindSafe(|| index.lookup_word(text))) {
            Ok(Ok(Some(entry))) if !entry.translation.trim().is_empty() => {
                debug!(word = %text, "Dictionary hit");
                Some(entry)
            }
            Ok(Ok(_)) => {
                debug!(word = %text, "Dictionary miss");
                None
            }
            Ok(Err(e)) => {
                error!(word = %text, error = %e, "Dictionary lookup failed");
                None
            }
            Err(payload) => {
                error!(word = %text, panic = %panic_message(payload.as_ref()), "Dictionary lookup panicked");
                None
            }
        }
    }

    async fn query_secondary(&self, text: &str) -> Option<DefinitionHit> {
        if !self.config.secondary.enabled {
            return None;
        }

        let secondary = Arc::clone(&self.secondary);
        let word = text.to_string();
        match tokio::task::spawn_blocking(move || secondary.query(&word)).await {
            Ok(hit) => hit,
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                error!(text = %text, panic = %panic_message(payload.as_ref()), "Secondary dictionary query panicked");
                None
            }
            Err(e) => {
                error!(text = %text, error = %e, "Secondary dictionary query was cancelled");
                None
            }
        }
    }

    /// Write a successful result back to the cache
    ///
    /// A rejected write (for example text longer than a cache key allows)
    /// only logs; the caller still gets the translation.
    fn remember(&self, result: &TranslationResult) {
        if !self.config.cache.enabled {
            return;
        }
        let (Some(target), Some(origin)) = (&result.target_text, result.origin) else {
            return;
        };

        if let Err(e) = self.cache.set(
            &result.source_text,
            target,
            result.category,
            origin,
            result.confidence_score,
        ) {
            warn!(text = %result.source_text, error = %e, "Could not cache translation");
        }
    }

    fn flight_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock();
        if let Some(lock) = inflight.get(key).and_then(Weak::upgrade) {
            return lock;
        }
        inflight.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        inflight.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Report which tiers can answer right now
    ///
    /// This forces a load of secondary dictionaries and of the neural model.
    pub async fn available_sources(&self) -> SourceAvailability {
        let secondary_dictionary = self.config.secondary.enabled && {
            let secondary = Arc::clone(&self.secondary);
            tokio::task::spawn_blocking(move || secondary.is_available())
                .await
                .unwrap_or(false)
        };

        SourceAvailability {
            cache: self.config.cache.enabled,
            dictionary: self.config.dictionary.enabled && self.dictionary.is_some(),
            secondary_dictionary,
            neural: self.config.neural.enabled && self.neural.is_available().await,
        }
    }

    pub fn persist_cache(&self) -> TranslateResult<()> {
        self.cache.persist()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn sweep_cache(&self) -> usize {
        self.cache.sweep_expired()
    }

    /// Persist the cache every `cache.auto_save_interval_secs` until the
    /// returned task is aborted
    ///
    /// Returns `None` when the cache is disabled or the interval is 0.
    pub fn spawn_auto_save(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let secs = self.config.cache.auto_save_interval_secs;
        if !self.config.cache.enabled || secs == 0 {
            return None;
        }

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.persist_cache() {
                    warn!(error = %e, "Periodic cache save failed");
                }
            }
        }))
    }
}

impl std::fmt::Debug for TranslationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationChain")
            .field("cache", &self.cache)
            .field("dictionary", &self.dictionary.as_ref().map(|d| d.len()))
            .field("secondary", &self.secondary)
            .field("neural", &self.neural)
            .finish()
    }
}
