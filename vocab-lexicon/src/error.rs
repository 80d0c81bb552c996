use thiserror::Error;

/// Error types for loading and querying word sources
#[derive(Debug, Error)]
pub enum LexiconError {
    /// Reading a dictionary file failed
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The word index file is not valid CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON dictionary file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No loader knows how to read this kind of file
    #[error("Unsupported dictionary format: {0}")]
    UnsupportedFormat(String),

    /// A file parsed, but an entry in it is malformed
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
}

impl LexiconError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        LexiconError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for lexicon operations
pub type LexiconResult<T> = Result<T, LexiconError>;
