//! Static word sources for the vocabulary analyzer
//!
//! - [`DictionaryIndex`]: exact-match English → Chinese index over ECDICT,
//!   with the markers used to derive a [`CefrLevel`]
//! - [`SecondaryDictionaries`]: auxiliary dictionaries discovered from a
//!   directory, lazily loaded and queried in priority order

pub mod error;
pub mod index;
pub mod level;
pub mod secondary;
pub mod source;

pub use error::{LexiconError, LexiconResult};
pub use index::{DictionaryIndex, WordEntry, WordLookup, normalize_word};
pub use level::CefrLevel;
pub use secondary::{
    DefinitionHit, DictionarySourceDescriptor, PriorityRule, PriorityTable, SecondaryDictionaries,
};
pub use source::{Definition, DictionaryLoader, DictionarySource, FileDictionaryLoader, MapSource};
