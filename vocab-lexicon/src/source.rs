//! Secondary dictionary sources and the loaders that open them
//!
//! A source answers `lookup(word)` with a single definition, a list of
//! definitions, or nothing. How a file on disk becomes a source is decided by
//! a [`DictionaryLoader`], so other binary formats can be plugged in without
//! touching the manager.
//!
//! [`FileDictionaryLoader`] reads only `.json` and `.tsv`. MDict `.mdx`
//! files are not discovered by default, and adding `mdx` to the extension
//! list without also supplying a loader that understands it leaves every
//! such file marked unavailable. Pass that loader to
//! `SecondaryDictionaries::with_loader`.

use crate::error::{LexiconError, LexiconResult};
use crate::index::normalize_word;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// What a source returns for a headword
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Definition {
    Text(String),
    List(Vec<String>),
}

impl Definition {
    /// The definition to report: the text itself, or the first non-empty
    /// list item. `None` when there is nothing usable.
    pub fn primary(&self) -> Option<&str> {
        match self {
            Definition::Text(text) => Some(text.as_str()).filter(|t| !t.trim().is_empty()),
            Definition::List(items) => items
                .iter()
                .map(String::as_str)
                .find(|t| !t.trim().is_empty()),
        }
    }
}

/// A loaded dictionary that can be queried
///
/// `Err` means the source itself is broken; the manager marks it
/// unavailable. A word that is simply absent is `Ok(None)`.
pub trait DictionarySource: Send + Sync {
    fn lookup(&self, word: &str) -> LexiconResult<Option<Definition>>;
}

/// Opens dictionary files into queryable sources
pub trait DictionaryLoader: Send + Sync {
    fn load(&self, path: &Path) -> LexiconResult<Box<dyn DictionarySource>>;
}

/// Word → definition map read fully into memory
#[derive(Debug, Default, Clone)]
pub struct MapSource {
    entries: HashMap<String, Definition>,
}

impl MapSource {
    pub fn new(entries: HashMap<String, Definition>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(word, definition)| (normalize_word(&word), definition))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DictionarySource for MapSource {
    fn lookup(&self, word: &str) -> LexiconResult<Option<Definition>> {
        Ok(self.entries.get(&normalize_word(word)).cloned())
    }
}

/// Loader for the two plain-text formats shipped with the analyzer
///
/// - `.json`: an object mapping each word to a string or an array of strings.
///   Keys starting with `@` are metadata and skipped.
/// - `.tsv`: one `word<TAB>definition` pair per line; blank lines and lines
///   starting with `#` are ignored. Repeated words accumulate into a list.
///
/// Any other extension, `.mdx` included, fails with
/// [`LexiconError::UnsupportedFormat`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDictionaryLoader;

impl FileDictionaryLoader {
    fn load_json(path: &Path) -> LexiconResult<MapSource> {
        let content = fs::read_to_string(path).map_err(|e| LexiconError::io(path, e))?;
        let json: serde_json::Value = serde_json::from_str(&content)?;

        let obj = json.as_object().ok_or_else(|| {
            LexiconError::InvalidEntry(format!(
                "root of '{}' must be an object",
                path.display()
            ))
        })?;

        let mut entries = HashMap::new();
        for (key, value) in obj {
            if key.starts_with('@') {
                continue;
            }
            let definition: Definition =
                serde_json::from_value(value.clone()).map_err(|_| {
                    LexiconError::InvalidEntry(format!(
                        "entry '{}' in '{}' is not a string or list of strings",
                        key,
                        path.display()
                    ))
                })?;
            entries.insert(key.clone(), definition);
        }

        Ok(MapSource::new(entries))
    }

    fn load_tsv(path: &Path) -> LexiconResult<MapSource> {
        let content = fs::read_to_string(path).map_err(|e| LexiconError::io(path, e))?;

        let mut collected: HashMap<String, Vec<String>> = HashMap::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (word, definition) = line.split_once('\t').ok_or_else(|| {
                LexiconError::InvalidEntry(format!(
                    "line {} of '{}' has no tab separator",
                    line_no + 1,
                    path.display()
                ))
            })?;
            collected
                .entry(normalize_word(word))
                .or_default()
                .push(definition.to_string());
        }

        let entries = collected
            .into_iter()
            .map(|(word, mut defs)| {
                let definition = if defs.len() == 1 {
                    Definition::Text(defs.remove(0))
                } else {
                    Definition::List(defs)
                };
                (word, definition)
            })
            .collect();

        Ok(MapSource::new(entries))
    }
}

impl DictionaryLoader for FileDictionaryLoader {
    fn load(&self, path: &Path) -> LexiconResult<Box<dyn DictionarySource>> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        let source = match extension.as_deref() {
            Some("json") => Self::load_json(path)?,
            Some("tsv") => Self::load_tsv(path)?,
            other => {
                return Err(LexiconError::UnsupportedFormat(format!(
                    "no loader for '{}' ({})",
                    path.display(),
                    other.unwrap_or("no extension")
                )));
            }
        };

        Ok(Box::new(source))
    }
}
