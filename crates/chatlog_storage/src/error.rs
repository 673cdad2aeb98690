//! Error types for transcript storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in a backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The artifact does not exist.
    #[error("artifact not found: {}", path.display())]
    NotFound {
        /// Path of the missing artifact.
        path: PathBuf,
    },

    /// Writing, reading, compressing or decompressing the compressed artifact failed.
    #[error("compressed artifact {} failed: {source}", path.display())]
    Compression {
        /// Path of the compressed artifact.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<StorageError>,
    },

    /// Reading or writing a slice or the metadata artifact failed.
    #[error("chunk artifact {} failed: {source}", path.display())]
    Chunk {
        /// Path of the slice or metadata artifact.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<StorageError>,
    },

    /// The serialized text does not decode to a record sequence.
    #[error("failed to parse record sequence: {source}")]
    Parse {
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The record sequence could not be serialized.
    #[error("failed to serialize record sequence: {source}")]
    Serialize {
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The chunk metadata artifact is malformed.
    #[error("invalid chunk metadata in {}: {message}", path.display())]
    InvalidMetadata {
        /// Path of the metadata artifact.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// The compressed path failed on every attempt and the chunked fallback failed too.
    #[error("save failed after {attempts} compressed attempts (MAX_RETRIES): {source}")]
    RetryExhausted {
        /// Number of compressed attempts made.
        attempts: u32,
        /// The fallback failure.
        #[source]
        source: Box<StorageError>,
    },

    /// The store configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A blocking I/O task panicked or was cancelled.
    #[error("I/O task failed: {0}")]
    TaskFailed(String),
}

impl StorageError {
    /// Creates a not-found error for `path`.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Wraps `source` as a failure of the compressed artifact at `path`.
    pub fn compression(path: impl Into<PathBuf>, source: StorageError) -> Self {
        Self::Compression {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Wraps `source` as a failure of the chunk artifact at `path`.
    pub fn chunk(path: impl Into<PathBuf>, source: StorageError) -> Self {
        Self::Chunk {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Converts a backend I/O error, mapping `ErrorKind::NotFound` to [`StorageError::NotFound`].
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::not_found(path)
        } else {
            Self::Io(err)
        }
    }

    /// Returns true if the error means the artifact is missing.
    ///
    /// Looks through [`StorageError::Compression`] and [`StorageError::Chunk`] wrappers.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Compression { source, .. } | Self::Chunk { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if the save retry bound was reached and the fallback failed.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. })
    }
}
