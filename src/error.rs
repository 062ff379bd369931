//! Error types for t-rex

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for t-rex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for t-rex
#[derive(Error, Debug)]
pub enum Error {
    /// A .trx file could not be parsed. Carries the provenance path so the
    /// user can tell which of several merged files was at fault.
    #[error("An error occurred while parsing {}: {source}", path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// The document structure does not match the TRX dialect.
    #[error("Malformed TRX document: {0}")]
    MalformedDocument(String),

    /// An `outcome` attribute was present but is not a known outcome.
    #[error("Unrecognized test outcome: {0:?}")]
    InvalidOutcome(String),

    /// A `startTime`/`endTime` attribute was present but unparseable.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// A `duration` attribute was present but unparseable.
    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    /// XML syntax error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Filter pattern could not be compiled.
    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Other error with custom message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an error with the path of the file being parsed.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Error {
        Error::ParseFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
