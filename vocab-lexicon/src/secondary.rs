//! Priority-ordered secondary dictionaries discovered from a directory
//!
//! Sources are found by extension at discovery time but only opened on first
//! use. A source that fails to open, or fails while being queried, is marked
//! unavailable and skipped for the rest of the process unless
//! [`SecondaryDictionaries::reset`] is called.
//!
//! ```ignore
//! use vocab_lexicon::SecondaryDictionaries;
//!
//! let dictionaries = SecondaryDictionaries::new("data/dictionaries");
//! dictionaries.discover();
//! if let Some(hit) = dictionaries.query("run") {
//!     println!("{} [{}]: {}", hit.word, hit.source_name, hit.definition);
//! }
//! ```

use crate::error::LexiconResult;
use crate::index::normalize_word;
use crate::source::{DictionaryLoader, DictionarySource, FileDictionaryLoader};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Stored load errors are cut to this many characters
const MAX_LOAD_ERROR_CHARS: usize = 500;

/// Maps a file-name substring to a priority (lower is tried first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub pattern: String,
    pub priority: u32,
}

impl PriorityRule {
    pub fn new(pattern: &str, priority: u32) -> Self {
        Self {
            pattern: pattern.to_string(),
            priority,
        }
    }
}

/// Ordered priority rules; the first rule whose pattern occurs in the
/// source name wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    rules: Vec<PriorityRule>,
    default_priority: u32,
}

impl PriorityTable {
    pub fn new(rules: Vec<PriorityRule>, default_priority: u32) -> Self {
        Self {
            rules,
            default_priority,
        }
    }

    pub fn priority_for(&self, name: &str) -> u32 {
        let name = name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| name.contains(&rule.pattern.to_lowercase()))
            .map(|rule| rule.priority)
            .unwrap_or(self.default_priority)
    }
}

impl Default for PriorityTable {
    /// Oxford, then Longman, then Collins; everything else after
    fn default() -> Self {
        Self::new(
            vec![
                PriorityRule::new("oald", 1),
                PriorityRule::new("ldoce", 2),
                PriorityRule::new("collins", 3),
            ],
            5,
        )
    }
}

/// A discovered dictionary file and what is known about it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictionarySourceDescriptor {
    /// File stem, e.g. `"oald9"` for `oald9.json`
    pub name: String,
    pub path: PathBuf,
    /// Fixed at discovery time
    pub priority: u32,
    pub available: bool,
    /// `None` until the first load attempt
    pub last_checked: Option<DateTime<Utc>>,
    pub load_error: Option<String>,
}

impl DictionarySourceDescriptor {
    fn new(path: PathBuf, priority: u32) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            priority,
            available: false,
            last_checked: None,
            load_error: None,
        }
    }

    pub fn is_checked(&self) -> bool {
        self.last_checked.is_some()
    }
}

/// A definition found in one of the secondary sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionHit {
    /// Normalized query word
    pub word: String,
    pub definition: String,
    pub source_name: String,
    pub priority: u32,
}

enum SlotState {
    Unchecked,
    Loaded(Arc<dyn DictionarySource>),
    Failed,
}

struct SourceSlot {
    descriptor: DictionarySourceDescriptor,
    state: SlotState,
}

impl SourceSlot {
    fn mark_failed(&mut self, message: String) {
        self.descriptor.available = false;
        self.descriptor.last_checked = Some(Utc::now());
        self.descriptor.load_error = Some(message.chars().take(MAX_LOAD_ERROR_CHARS).collect());
        self.state = SlotState::Failed;
    }
}

/// Best-effort lookups over zero or more auxiliary dictionaries
pub struct SecondaryDictionaries {
    dir: PathBuf,
    extensions: Vec<String>,
    priorities: PriorityTable,
    loader: Arc<dyn DictionaryLoader>,
    slots: Mutex<Vec<SourceSlot>>,
}

impl SecondaryDictionaries {
    /// Create a manager for `dir` with the built-in file loader, `json` and
    /// `tsv` extensions and the default priority table. Nothing is scanned
    /// until [`discover`](Self::discover) is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extensions: vec!["json".to_string(), "tsv".to_string()],
            priorities: PriorityTable::default(),
            loader: Arc::new(FileDictionaryLoader),
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn DictionaryLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_priorities(mut self, priorities: PriorityTable) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the directory and replace the known sources
    ///
    /// A missing directory yields an empty list. Sources are sorted by
    /// priority, then by file name, so results are reproducible.
    pub fn discover(&self) -> Vec<DictionarySourceDescriptor> {
        let mut descriptors = Vec::new();

        match fs::read_dir(&self.dir) {
            Ok(entries) => {
                let mut paths: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| path.is_file() && self.has_known_extension(path))
                    .collect();
                paths.sort();

                for path in paths {
                    let name = path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let priority = self.priorities.priority_for(&name);
                    descriptors.push(DictionarySourceDescriptor::new(path, priority));
                }
                descriptors.sort_by_key(|d| d.priority);
            }
            Err(e) => {
                warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Dictionaries directory not readable"
                );
            }
        }

        info!(count = descriptors.len(), "Discovered secondary dictionaries");

        *self.slots.lock() = descriptors
            .iter()
            .cloned()
            .map(|descriptor| SourceSlot {
                descriptor,
                state: SlotState::Unchecked,
            })
            .collect();

        descriptors
    }

    fn has_known_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Snapshot of every discovered source, in priority order
    pub fn descriptors(&self) -> Vec<DictionarySourceDescriptor> {
        self.slots
            .lock()
            .iter()
            .map(|slot| slot.descriptor.clone())
            .collect()
    }

    /// Look a word up across all sources, highest priority first
    ///
    /// Returns the first non-empty definition. Empty or whitespace-only input
    /// returns `None` without touching any source.
    pub fn query(&self, word: &str) -> Option<DefinitionHit> {
        let word = normalize_word(word);
        if word.is_empty() {
            return None;
        }

        let count = self.slots.lock().len();
        for position in 0..count {
            let Some((source, name, priority)) = self.source_at(position) else {
                continue;
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| source.lookup(&word)))
                .unwrap_or_else(|_| {
                    Err(crate::error::LexiconError::InvalidEntry(
                        "source panicked during lookup".to_string(),
                    ))
                });

            match outcome {
                Ok(Some(definition)) => {
                    if let Some(text) = definition.primary() {
                        debug!(word = %word, dictionary = %name, "Secondary dictionary hit");
                        return Some(DefinitionHit {
                            word,
                            definition: text.to_string(),
                            source_name: name,
                            priority,
                        });
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(dictionary = %name, error = %e, "Error querying dictionary");
                    if let Some(slot) = self.slots.lock().get_mut(position) {
                        slot.mark_failed(format!("Lookup failed: {}", e));
                    }
                }
            }
        }

        debug!(word = %word, "Word not found in secondary dictionaries");
        None
    }

    /// Open the source at `position` if needed and hand out its handle
    ///
    /// The slot lock is held across the load so a source is never opened
    /// twice concurrently.
    fn source_at(&self, position: usize) -> Option<(Arc<dyn DictionarySource>, String, u32)> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(position)?;

        if matches!(slot.state, SlotState::Unchecked) {
            self.load_slot(slot);
        }

        match &slot.state {
            SlotState::Loaded(source) => Some((
                Arc::clone(source),
                slot.descriptor.name.clone(),
                slot.descriptor.priority,
            )),
            _ => None,
        }
    }

    fn load_slot(&self, slot: &mut SourceSlot) {
        let path = slot.descriptor.path.clone();
        let loaded: LexiconResult<Box<dyn DictionarySource>> =
            catch_unwind(AssertUnwindSafe(|| self.loader.load(&path))).unwrap_or_else(|_| {
                Err(crate::error::LexiconError::InvalidEntry(
                    "loader panicked".to_string(),
                ))
            });

        match loaded {
            Ok(source) => {
                slot.descriptor.available = true;
                slot.descriptor.last_checked = Some(Utc::now());
                slot.descriptor.load_error = None;
                slot.state = SlotState::Loaded(Arc::from(source));
                info!(dictionary = %slot.descriptor.name, "Loaded dictionary");
            }
            Err(e) => {
                error!(dictionary = %slot.descriptor.name, error = %e, "Error loading dictionary");
                slot.mark_failed(format!("Failed to load dictionary: {}", e));
            }
        }
    }

    /// Sources that loaded successfully, forcing a load of any that have
    /// not been tried yet
    pub fn available_sources(&self) -> Vec<DictionarySourceDescriptor> {
        let mut slots = self.slots.lock();
        for slot in slots.iter_mut() {
            if matches!(slot.state, SlotState::Unchecked) {
                self.load_slot(slot);
            }
        }
        slots
            .iter()
            .filter(|slot| slot.descriptor.available)
            .map(|slot| slot.descriptor.clone())
            .collect()
    }

    pub fn is_available(&self) -> bool {
        !self.available_sources().is_empty()
    }

    /// Forget loaded handles and failures so every source is retried
    pub fn reset(&self) {
        for slot in self.slots.lock().iter_mut() {
            slot.state = SlotState::Unchecked;
            slot.descriptor.available = false;
            slot.descriptor.last_checked = None;
            slot.descriptor.load_error = None;
        }
    }
}

impl std::fmt::Debug for SecondaryDictionaries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryDictionaries")
            .field("dir", &self.dir)
            .field("extensions", &self.extensions)
            .field("sources", &self.slots.lock().len())
            .finish()
    }
}
