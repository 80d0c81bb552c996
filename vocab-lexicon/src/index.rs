//! In-memory word index over an ECDICT-style CSV file
//!
//! The index is read-only after load. Lookups are exact matches on the
//! trimmed, lowercased headword.
//!
//! ```ignore
//! use vocab_lexicon::DictionaryIndex;
//!
//! let index = DictionaryIndex::from_csv_path("data/dictionaries/ECDICT/ecdict.csv".as_ref())?;
//! if let Some(entry) = index.lookup("Hello") {
//!     println!("{} → {} ({})", entry.word, entry.translation, entry.cefr_level());
//! }
//! ```

use crate::error::{LexiconError, LexiconResult};
use crate::level::CefrLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// One headword and its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    /// Lowercased headword
    pub word: String,
    /// Chinese translation, possibly several lines (`"n. 你好\nint. 喂"`)
    pub translation: String,
    pub pos: String,
    pub phonetic: String,
    /// Collins star rating, 0-5
    pub collins: u32,
    /// 1 when the word is in the Oxford 3000
    pub oxford: u32,
    pub frequency: u64,
    /// Exam tags such as `"zk gk cet4"`
    pub tag: String,
}

impl WordEntry {
    /// Build an entry with only a translation; all markers are zero
    pub fn new(word: &str, translation: &str) -> Self {
        Self {
            word: normalize_word(word),
            translation: translation.to_string(),
            pos: String::new(),
            phonetic: String::new(),
            collins: 0,
            oxford: 0,
            frequency: 0,
            tag: String::new(),
        }
    }

    pub fn with_markers(mut self, oxford: u32, collins: u32, frequency: u64) -> Self {
        self.oxford = oxford;
        self.collins = collins;
        self.frequency = frequency;
        self
    }

    pub fn cefr_level(&self) -> CefrLevel {
        CefrLevel::assign(self.oxford, self.collins, self.frequency)
    }
}

/// A row of the ECDICT CSV. Unknown columns are ignored and unparseable
/// numbers read as absent.
#[derive(Debug, Deserialize)]
struct EcdictRow {
    word: String,
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    pos: Option<String>,
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    collins: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    oxford: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    frq: Option<u64>,
    #[serde(default)]
    tag: Option<String>,
}

impl EcdictRow {
    fn into_entry(self) -> Option<WordEntry> {
        let word = normalize_word(&self.word);
        if word.is_empty() {
            return None;
        }
        Some(WordEntry {
            word,
            // ECDICT escapes line breaks inside a field as a literal `\n`
            translation: self.translation.unwrap_or_default().replace("\\n", "\n"),
            pos: self.pos.unwrap_or_default(),
            phonetic: self.phonetic.unwrap_or_default(),
            collins: self.collins.unwrap_or(0),
            oxford: self.oxford.unwrap_or(0),
            frequency: self.frq.unwrap_or(0),
            tag: self.tag.unwrap_or_default(),
        })
    }
}

/// Trim and lowercase a headword the way every lookup key is formed
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Key → entry lookup used by the translation chain
///
/// `DictionaryIndex` is the production implementation. An `Err` signals a
/// fault inside the source, not a miss; misses are `Ok(None)`.
pub trait WordLookup: Send + Sync {
    fn lookup_word(&self, word: &str) -> LexiconResult<Option<WordEntry>>;

    /// Number of headwords available
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact-match word index, immutable once built
#[derive(Debug, Default, Clone)]
pub struct DictionaryIndex {
    entries: HashMap<String, WordEntry>,
}

impl DictionaryIndex {
    /// Load the index from an ECDICT CSV file with a header row
    ///
    /// Rows with a blank headword are skipped, as are rows the CSV reader
    /// cannot decode; the number of skipped rows is logged.
    ///
    /// # Errors
    /// - File not found or unreadable
    /// - Header row missing or without a `word` column
    pub fn from_csv_path(path: &Path) -> LexiconResult<Self> {
        let file = File::open(path).map_err(|e| LexiconError::io(path, e))?;
        let index = Self::from_csv_reader(file)?;
        info!(
            path = %path.display(),
            words = index.len(),
            "Loaded dictionary index"
        );
        Ok(index)
    }

    /// Load from any reader producing ECDICT CSV
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> LexiconResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if !headers.iter().any(|h| h == "word") {
            return Err(LexiconError::InvalidEntry(
                "CSV header has no 'word' column".to_string(),
            ));
        }

        let mut entries = HashMap::new();
        let mut skipped = 0usize;
        for row in csv_reader.deserialize::<EcdictRow>() {
            match row {
                Ok(row) => match row.into_entry() {
                    Some(entry) => {
                        entries.insert(entry.word.clone(), entry);
                    }
                    None => skipped += 1,
                },
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "Skipped unusable rows while building dictionary index");
        }

        Ok(Self { entries })
    }

    pub fn from_entries<I: IntoIterator<Item = WordEntry>>(entries: I) -> Self {
        let entries = entries
            .into_iter()
            .filter(|e| !e.word.is_empty())
            .map(|e| (e.word.clone(), e))
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, word: &str) -> Option<&WordEntry> {
        let key = normalize_word(word);
        if key.is_empty() {
            return None;
        }
        self.entries.get(&key)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WordLookup for DictionaryIndex {
    fn lookup_word(&self, word: &str) -> LexiconResult<Option<WordEntry>> {
        Ok(self.lookup(word).cloned())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
