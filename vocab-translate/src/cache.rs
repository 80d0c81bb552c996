//! Persistent translation cache with time-based expiry
//!
//! Entries are keyed by `"{category}:{lowercased, trimmed text}"`, so the
//! same text cached as a word and as a phrase are separate entries. Expired
//! entries are dropped lazily on `get` and eagerly by `sweep_expired`.
//! Nothing is written to disk until [`TranslationCache::persist`] is called.
//!
//! # File format
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "metadata": {
//!     "created_at": "2026-10-01T08:00:00Z",
//!     "last_updated": "2026-10-18T09:30:00Z",
//!     "total_entries": 1,
//!     "expiry_days": 30
//!   },
//!   "entries": {
//!     "word:hello": {
//!       "source_text": "hello",
//!       "target_text": "int. 喂；你好",
//!       "timestamp": 1791100000,
//!       "translation_type": "word",
//!       "source": "dictionary",
//!       "confidence_score": 0.95,
//!       "access_count": 3
//!     }
//!   }
//! }
//! ```

use crate::config::CacheConfig;
use crate::data::{Category, Origin};
use crate::error::{TranslateError, TranslateResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CACHE_FORMAT_VERSION: &str = "1.0.0";
pub const MAX_SOURCE_CHARS: usize = 500;
pub const MAX_TARGET_CHARS: usize = 2000;

const SECONDS_PER_DAY: i64 = 86_400;
/// How far in the future a stored timestamp may lie before it is rejected
const MAX_CLOCK_SKEW_SECS: i64 = SECONDS_PER_DAY;
/// Share of `max_entries` evicted in one pass once the cache is full
const EVICTION_BATCH_DIVISOR: usize = 10;

/// Build the lookup key for a text and category
pub fn cache_key(text: &str, category: Category) -> String {
    format!("{}:{}", category.as_str(), text.trim().to_lowercase())
}

/// One cached translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source_text: String,
    pub target_text: String,
    /// Creation time, Unix seconds
    pub timestamp: i64,
    #[serde(rename = "translation_type")]
    pub category: Category,
    #[serde(rename = "source")]
    pub origin: Origin,
    pub confidence_score: f64,
    pub access_count: u64,
}

impl CacheEntry {
    /// Build and validate an entry stamped with the current time
    pub fn new(
        text: &str,
        target: &str,
        category: Category,
        origin: Origin,
        confidence_score: f64,
    ) -> TranslateResult<Self> {
        let entry = Self {
            source_text: text.trim().to_string(),
            target_text: target.to_string(),
            timestamp: Utc::now().timestamp(),
            category,
            origin,
            confidence_score,
            access_count: 1,
        };
        entry.validate()?;
        Ok(entry)
    }

    pub fn validate(&self) -> TranslateResult<()> {
        let source_chars = self.source_text.trim().chars().count();
        if source_chars == 0 || source_chars > MAX_SOURCE_CHARS {
            return Err(TranslateError::Validation(format!(
                "Source text must be 1-{} characters, got {}",
                MAX_SOURCE_CHARS, source_chars
            )));
        }

        let target_chars = self.target_text.chars().count();
        if self.target_text.trim().is_empty() || target_chars > MAX_TARGET_CHARS {
            return Err(TranslateError::Validation(format!(
                "Translation must be 1-{} characters, got {}",
                MAX_TARGET_CHARS, target_chars
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(TranslateError::Validation(format!(
                "Confidence score must be between 0.0 and 1.0, got {}",
                self.confidence_score
            )));
        }

        if self.access_count == 0 {
            return Err(TranslateError::Validation(
                "Access count must be at least 1".to_string(),
            ));
        }

        let latest = Utc::now().timestamp().saturating_add(MAX_CLOCK_SKEW_SECS);
        if self.timestamp < 0 || self.timestamp > latest || self.created_at().is_none() {
            return Err(TranslateError::Validation(format!(
                "Timestamp {} is outside the supported range",
                self.timestamp
            )));
        }

        Ok(())
    }

    pub fn key(&self) -> String {
        cache_key(&self.source_text, self.category)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    fn is_expired(&self, now: i64, expiry_days: u32) -> bool {
        now.saturating_sub(self.timestamp) > i64::from(expiry_days) * SECONDS_PER_DAY
    }
}

/// Aggregate view over the cache contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_origin: BTreeMap<Origin, usize>,
    pub total_accesses: u64,
    pub avg_accesses_per_entry: f64,
}

#[derive(Serialize)]
struct PersistedCache<'a> {
    version: &'a str,
    metadata: PersistedMetadata,
    entries: BTreeMap<&'a str, &'a CacheEntry>,
}

#[derive(Serialize)]
struct PersistedMetadata {
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    total_entries: usize,
    expiry_days: u32,
}

/// Read side of the file format. Every part is optional so that a document
/// with a damaged entry or metadata block still yields what is usable.
#[derive(Deserialize, Default)]
#[serde(default)]
struct StoredCache {
    version: Option<String>,
    metadata: StoredMetadata,
    entries: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StoredMetadata {
    created_at: Option<String>,
    #[serde(alias = "cache_expiry_days")]
    expiry_days: Option<u32>,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    expiry_days: u32,
    created_at: Option<DateTime<Utc>>,
}

impl CacheState {
    fn remove_expired(&mut self, now: i64) -> usize {
        let expiry_days = self.expiry_days;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, expiry_days));
        before - self.entries.len()
    }

    /// Make room for one more key, dropping expired entries first and then
    /// the oldest entries
    ///
    /// Eviction frees an extra tenth of `max_entries` so that a stream of new
    /// keys does not scan the whole map on every write.
    fn make_room(&mut self, max_entries: usize, now: i64) {
        if self.entries.len() < max_entries {
            return;
        }
        let swept = self.remove_expired(now);
        if swept > 0 {
            debug!(swept, "Dropped expired entries to make room");
        }
        if self.entries.len() < max_entries {
            return;
        }

        let evict = (self.entries.len() + 1 - max_entries + max_entries / EVICTION_BATCH_DIVISOR)
            .min(self.entries.len());
        let mut by_age: Vec<(i64, &String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.timestamp, key))
            .collect();
        by_age.select_nth_unstable(evict - 1);
        let victims: Vec<String> = by_age[..evict].iter().map(|(_, key)| (*key).clone()).collect();

        for key in &victims {
            self.entries.remove(key);
        }
        debug!(evicted = victims.len(), "Evicted oldest cache entries");
    }
}

/// Durable (text, category) → translation memo shared by all callers
pub struct TranslationCache {
    path: PathBuf,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl TranslationCache {
    /// Create an empty cache bound to `path` without touching the disk
    pub fn new(path: impl Into<PathBuf>, expiry_days: u32) -> Self {
        Self {
            path: path.into(),
            max_entries: usize::MAX,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                expiry_days,
                created_at: None,
            }),
        }
    }

    /// Create a cache bound to `path` and load whatever is stored there
    pub fn open(path: impl Into<PathBuf>, expiry_days: u32) -> Self {
        let cache = Self::new(path, expiry_days);
        cache.reload();
        cache
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.file_path, config.expiry_days).with_max_entries(config.max_entries)
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn expiry_days(&self) -> u32 {
        self.state.lock().expiry_days
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Fetch an entry, counting the access
    ///
    /// An expired entry is removed by this call and reported as absent.
    pub fn get(&self, text: &str, category: Category) -> Option<CacheEntry> {
        let key = cache_key(text, category);
        let now = Utc::now().timestamp();
        let mut state = self.state.lock();
        let expiry_days = state.expiry_days;

        let expired = state.entries.get(&key)?.is_expired(now, expiry_days);
        if expired {
            debug!(key = %key, "Cache entry expired");
            state.entries.remove(&key);
            return None;
        }

        let entry = state.entries.get_mut(&key)?;
        entry.access_count = entry.access_count.saturating_add(1);
        Some(entry.clone())
    }

    /// Whether a live entry exists, without counting an access
    pub fn contains(&self, text: &str, category: Category) -> bool {
        let key = cache_key(text, category);
        let now = Utc::now().timestamp();
        let state = self.state.lock();
        state
            .entries
            .get(&key)
            .is_some_and(|entry| !entry.is_expired(now, state.expiry_days))
    }

    /// Store a translation, replacing any entry for the same key
    ///
    /// The new entry gets the current time and an access count of 1.
    ///
    /// # Errors
    /// `TranslateError::Validation` when the text is not 1-500 characters,
    /// the translation is not 1-2000 characters, or the confidence is outside
    /// [0, 1]. The cache is unchanged on error.
    pub fn set(
        &self,
        text: &str,
        target: &str,
        category: Category,
        origin: Origin,
        confidence_score: f64,
    ) -> TranslateResult<()> {
        let entry = CacheEntry::new(text, target, category, origin, confidence_score)?;
        self.store(entry);
        Ok(())
    }

    /// Store a pre-built entry, keeping its timestamp and access count
    pub fn insert_entry(&self, entry: CacheEntry) -> TranslateResult<()> {
        entry.validate()?;
        self.store(entry);
        Ok(())
    }

    fn store(&self, entry: CacheEntry) {
        let key = entry.key();
        let now = Utc::now().timestamp();
        let mut state = self.state.lock();
        if !state.entries.contains_key(&key) {
            state.make_room(self.max_entries, now);
        }
        state.entries.insert(key, entry);
    }

    /// Remove every expired entry; returns how many were removed
    pub fn sweep_expired(&self) -> usize {
        let removed = self.state.lock().remove_expired(Utc::now().timestamp());
        if removed > 0 {
            info!(removed, "Swept expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut by_category = BTreeMap::new();
        let mut by_origin = BTreeMap::new();
        let mut total_accesses = 0u64;

        for entry in state.entries.values() {
            *by_category.entry(entry.category).or_insert(0) += 1;
            *by_origin.entry(entry.origin).or_insert(0) += 1;
            total_accesses = total_accesses.saturating_add(entry.access_count);
        }

        let total_entries = state.entries.len();
        CacheStats {
            total_entries,
            by_category,
            by_origin,
            total_accesses,
            avg_accesses_per_entry: if total_entries > 0 {
                total_accesses as f64 / total_entries as f64
            } else {
                0.0
            },
        }
    }

    /// Write every entry and the metadata block to the cache file
    ///
    /// The document is written to a temporary sibling and renamed into
    /// place; parent directories are created as needed.
    pub fn persist(&self) -> TranslateResult<()> {
        let now = Utc::now();
        let (bytes, total) = {
            let mut state = self.state.lock();
            let created_at = *state.created_at.get_or_insert(now);
            let document = PersistedCache {
                version: CACHE_FORMAT_VERSION,
                metadata: PersistedMetadata {
                    created_at,
                    last_updated: now,
                    total_entries: state.entries.len(),
                    expiry_days: state.expiry_days,
                },
                entries: state
                    .entries
                    .iter()
                    .map(|(key, entry)| (key.as_str(), entry))
                    .collect(),
            };
            (serde_json::to_vec_pretty(&document)?, state.entries.len())
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "translation_cache.json".to_string());
        let tmp_path = self.path.with_file_name(format!("{}.tmp", file_name));
        fs::write(&tmp_path, bytes)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                debug!(path = %tmp_path.display(), error = %cleanup, "Could not remove temporary cache file");
            }
            return Err(e.into());
        }

        info!(path = %self.path.display(), entries = total, "Persisted translation cache");
        Ok(())
    }

    /// Replace the in-memory entries with the contents of the cache file
    ///
    /// A missing file gives an empty cache. An unreadable or unparseable file
    /// also gives an empty cache and logs a warning. Entries that fail to
    /// decode or validate are skipped individually. Returns the number of
    /// entries loaded.
    pub fn reload(&self) -> usize {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file, starting empty");
                self.replace(HashMap::new(), None, None);
                return 0;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read cache file");
                self.replace(HashMap::new(), None, None);
                return 0;
            }
        };

        let stored: StoredCache = match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not parse cache file");
                self.replace(HashMap::new(), None, None);
                return 0;
            }
        };

        if let Some(version) = stored.version.as_deref()
            && version != CACHE_FORMAT_VERSION
        {
            warn!(version, expected = CACHE_FORMAT_VERSION, "Cache file version differs");
        }

        let mut entries = HashMap::with_capacity(stored.entries.len());
        let mut skipped = 0usize;
        for (key, value) in stored.entries {
            match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) if entry.validate().is_ok() => {
                    entries.insert(entry.key(), entry);
                }
                _ => {
                    debug!(key = %key, "Skipping unreadable cache entry");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, "Skipped unreadable cache entries");
        }

        let created_at = stored
            .metadata
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let loaded = entries.len();
        self.replace(entries, stored.metadata.expiry_days, created_at);
        info!(path = %self.path.display(), entries = loaded, "Loaded translation cache");
        loaded
    }

    fn replace(
        &self,
        entries: HashMap<String, CacheEntry>,
        expiry_days: Option<u32>,
        created_at: Option<DateTime<Utc>>,
    ) {
        let mut state = self.state.lock();
        state.entries = entries;
        if let Some(days) = expiry_days.filter(|days| *days > 0) {
            state.expiry_days = days;
        }
        state.created_at = created_at;
    }
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TranslationCache")
            .field("path", &self.path)
            .field("entries", &state.entries.len())
            .field("expiry_days", &state.expiry_days)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
