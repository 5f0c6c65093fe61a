//! Error types for corpus construction.
//!
//! Library modules return [`CorpusError`]; the binary wraps it with `anyhow`.

use std::{path::PathBuf, time::Duration};

/// Top-level error type for pipeline, cache and assembler operations.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// Embedding dimensionality without a model artifact convention.
    #[error("invalid configuration: dim must be 100, 300 or 600 (got {0})")]
    InvalidDimension(usize),

    /// A document file that is not a valid JSON record.
    #[error("malformed document {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A filename that cannot be used as a cache entry name.
    #[error("invalid cache key {0:?}")]
    InvalidKey(String),

    /// Cache entry exists but does not hold a JSON string.
    #[error("corrupt cache entry {path:?}: {source}")]
    CacheEncoding {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Normalization task did not finish within the drain bound.
    #[error("normalization of {filename} did not finish within {after:?}")]
    TaskTimeout { filename: String, after: Duration },

    /// Normalization task was lost (panicked or cancelled).
    #[error("normalization worker for {filename} was lost: {reason}")]
    WorkerLost { filename: String, reason: String },

    /// The pipeline driver task ended without reporting.
    #[error("pipeline driver stopped: {0}")]
    DriverLost(String),

    /// A model vector whose length disagrees with the model dimensionality.
    #[error("vector for {tag} has {found} components, expected {expected}")]
    VectorShape {
        tag: String,
        expected: usize,
        found: usize,
    },

    /// Feature or label arrays could not be shaped.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// A model tag with no raw record to join against.
    #[error("no raw record for tag {tag} at {path:?}")]
    MissingRecord { tag: String, path: PathBuf },
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, CorpusError>;

impl CorpusError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach a path to a JSON parse error.
    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }
}
