//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// An in-memory storage backend.
///
/// This backend keeps every artifact in a map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral transcripts that don't need persistence
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use chatlog_storage::{StorageBackend, InMemoryBackend};
/// use std::path::Path;
///
/// let backend = InMemoryBackend::new();
/// backend.write(Path::new("t.meta"), b"{\"totalChunks\":1}").unwrap();
/// assert!(backend.contains(Path::new("t.meta")));
/// assert_eq!(backend.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    artifacts: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the paths of all stored artifacts, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.artifacts.read().keys().cloned().collect()
    }

    /// Returns true if an artifact is stored at `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.artifacts.read().contains_key(path)
    }

    /// Returns the number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    /// Returns true if no artifacts are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }

    /// Removes every artifact.
    pub fn clear(&self) {
        self.artifacts.write().clear();
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        self.artifacts
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        self.artifacts
            .write()
            .insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        self.artifacts
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        Ok(self
            .artifacts
            .read()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }
}
