//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to an artifact path while its replacement is being written.
pub const TEMP_SUFFIX: &str = ".tmp";

/// A file-based storage backend.
///
/// Each artifact is one OS file. Data survives process restarts.
///
/// # Durability
///
/// `write()` writes a sibling temp file, calls `File::sync_all()`, renames it
/// over the artifact and fsyncs the parent directory. A crash mid-write leaves
/// either the old artifact or the new one, never a torn file.
///
/// # Example
///
/// ```no_run
/// use chatlog_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::new();
/// backend.write(Path::new("history/cline_messages.gz"), b"data").unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBackend;

impl FileBackend {
    /// Creates a new file backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the temp path used while replacing `path`.
    #[must_use]
    pub fn temp_path(path: &Path) -> PathBuf {
        let mut name: OsString = path.as_os_str().to_owned();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }
}

/// Returns the directory holding `path`, treating a bare file name as `.`.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Syncs a directory so renames and deletions inside it are durable.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> io::Result<()> {
    // NTFS journaling covers directory metadata
    Ok(())
}

impl StorageBackend for FileBackend {
    fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        fs::read(path).map_err(|e| StorageError::from_io(path, e))
    }

    fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let dir = parent_dir(path);
        fs::create_dir_all(dir)?;

        let temp_path = Self::temp_path(path);
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        sync_directory(dir)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        fs::remove_file(path).map_err(|e| StorageError::from_io(path, e))
    }

    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}
