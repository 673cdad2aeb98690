//! Storage backend trait definition.

use crate::error::StorageResult;
use std::path::{Path, PathBuf};

/// A low-level artifact store for transcript data.
///
/// Storage backends are **opaque byte stores** addressed by path. They read
/// and replace whole artifacts; the transcript store owns every format
/// decision (compression, chunking, metadata).
///
/// # Invariants
///
/// - `write` replaces the full contents of an artifact and is durable on return
/// - `read` returns exactly the bytes of the last successful `write`
/// - Missing artifacts surface as [`crate::StorageError::NotFound`] from
///   `read` and `remove`
/// - Backends must be `Send + Sync`; the store calls them from blocking tasks
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the full contents of the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the artifact does not
    /// exist, or an I/O error.
    fn read(&self, path: &Path) -> StorageResult<Vec<u8>>;

    /// Replaces the artifact at `path` with `data`.
    ///
    /// After this returns successfully the new contents survive process
    /// termination.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()>;

    /// Removes the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the artifact does not
    /// exist, or an I/O error.
    fn remove(&self, path: &Path) -> StorageResult<()>;

    /// Lists the artifacts directly inside `dir`.
    ///
    /// A missing directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<PathBuf>>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        (**self).write(path, data)
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        (**self).remove(path)
    }

    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        (**self).list_dir(dir)
    }
}
