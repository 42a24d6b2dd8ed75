//! Error types for the prompt library.
//!
//! Query parse failures are surfaced unchanged to the caller. Load failures are
//! produced per file by the loaders, logged, and never abort an index build.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// A malformed query. Nothing is executed when parsing fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}: '{token}'")]
pub struct ParseError {
    pub message: String,
    /// The offending token, verbatim from the input
    pub token: String,
    /// Byte offset of the token in the query string
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, token: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            token: token.into(),
            position,
        }
    }
}

/// Main error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid query: {0}")]
    Parse(#[from] ParseError),

    /// A single library file could not be loaded
    #[error("Failed to load {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Not found in library: {0}")]
    NotFound(String),

    #[error("Refusing to overwrite existing file: {0}")]
    AlreadyExists(PathBuf),

    #[error("Invalid library path: {0}")]
    InvalidPath(String),

    /// Index inconsistency. Should be unreachable.
    #[error("Internal index error: {0}")]
    Internal(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this is a query parse failure (exit status differs in the CLI)
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}
