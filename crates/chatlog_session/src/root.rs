//! Storage root suppliers.

use std::path::{Path, PathBuf};

/// Supplies the directory a session keeps its artifacts in.
///
/// Hosts usually own one directory per task; anything that can name that
/// directory can back a [`crate::MessageHistory`].
pub trait StorageRoot {
    /// Returns the root directory.
    fn storage_root(&self) -> &Path;
}

impl StorageRoot for Path {
    fn storage_root(&self) -> &Path {
        self
    }
}

impl StorageRoot for PathBuf {
    fn storage_root(&self) -> &Path {
        self.as_path()
    }
}

impl<T: StorageRoot + ?Sized> StorageRoot for &T {
    fn storage_root(&self) -> &Path {
        (**self).storage_root()
    }
}
