//! On-disk artifact naming for one transcript.
//!
//! All artifacts of a transcript share a base path `P`:
//!
//! ```text
//! P.gz        # gzip-compressed record sequence
//! P.meta      # {"totalChunks": n}
//! P.0 .. P.(n-1)  # raw slices of the serialized record sequence
//! ```

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extension of the compressed artifact.
pub const COMPRESSED_EXT: &str = "gz";
/// Extension of the chunk metadata artifact.
pub const META_EXT: &str = "meta";

/// Contents of the chunk metadata artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Number of slice artifacts.
    #[serde(rename = "totalChunks")]
    pub total_chunks: usize,
}

impl ChunkMeta {
    /// Encodes the metadata as JSON.
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| StorageError::Serialize { source })
    }

    /// Decodes metadata read from `path`.
    pub fn decode(path: &Path, data: &[u8]) -> StorageResult<Self> {
        serde_json::from_slice(data).map_err(|e| StorageError::InvalidMetadata {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Paths of every artifact belonging to one base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    base: PathBuf,
}

impl ArtifactLayout {
    /// Creates a layout rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base path.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the directory holding the artifacts.
    #[must_use]
    pub fn dir(&self) -> &Path {
        match self.base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.base.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Path of the compressed artifact.
    #[must_use]
    pub fn compressed_path(&self) -> PathBuf {
        self.with_suffix(COMPRESSED_EXT)
    }

    /// Path of the chunk metadata artifact.
    #[must_use]
    pub fn meta_path(&self) -> PathBuf {
        self.with_suffix(META_EXT)
    }

    /// Path of slice `index`.
    #[must_use]
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.with_suffix(&index.to_string())
    }

    /// Returns the slice index if `path` names a slice artifact of this layout.
    #[must_use]
    pub fn chunk_index(&self, path: &Path) -> Option<usize> {
        let base_name = self.base.file_name()?.to_str()?;
        let name = path.file_name()?.to_str()?;
        let digits = name.strip_prefix(base_name)?.strip_prefix('.')?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Returns true if `path` is a leftover temp file of one of this layout's artifacts.
    #[must_use]
    pub fn is_stale_temp(&self, path: &Path, temp_suffix: &str) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let Some(artifact) = name.strip_suffix(temp_suffix) else {
            return false;
        };
        let artifact = Path::new(artifact);

        Some(artifact.as_os_str()) == self.compressed_path().file_name()
            || Some(artifact.as_os_str()) == self.meta_path().file_name()
            || self.chunk_index(artifact).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths() {
        let layout = ArtifactLayout::new("/data/cline_messages");
        assert_eq!(
            layout.compressed_path(),
            PathBuf::from("/data/cline_messages.gz")
        );
        assert_eq!(layout.meta_path(), PathBuf::from("/data/cline_messages.meta"));
        assert_eq!(layout.chunk_path(0), PathBuf::from("/data/cline_messages.0"));
        assert_eq!(layout.chunk_path(12), PathBuf::from("/data/cline_messages.12"));
        assert_eq!(layout.dir(), Path::new("/data"));
    }

    #[test]
    fn bare_base_name_uses_current_dir() {
        let layout = ArtifactLayout::new("cline_messages");
        assert_eq!(layout.dir(), Path::new("."));
    }

    #[test]
    fn chunk_index_recognizes_slices_only() {
        let layout = ArtifactLayout::new("/data/cline_messages");

        assert_eq!(layout.chunk_index(Path::new("/data/cline_messages.0")), Some(0));
        assert_eq!(layout.chunk_index(Path::new("/data/cline_messages.37")), Some(37));
        assert_eq!(layout.chunk_index(Path::new("/data/cline_messages.gz")), None);
        assert_eq!(layout.chunk_index(Path::new("/data/cline_messages.meta")), None);
        assert_eq!(layout.chunk_index(Path::new("/data/cline_messages.")), None);
        assert_eq!(layout.chunk_index(Path::new("/data/cline_messages.1a")), None);
        assert_eq!(layout.chunk_index(Path::new("/data/other.0")), None);
        assert_eq!(layout.chunk_index(Path::new("/data/cline_messages_old.0")), None);
    }

    #[test]
    fn stale_temp_detection() {
        let layout = ArtifactLayout::new("/data/cline_messages");

        assert!(layout.is_stale_temp(Path::new("/data/cline_messages.gz.tmp"), ".tmp"));
        assert!(layout.is_stale_temp(Path::new("/data/cline_messages.meta.tmp"), ".tmp"));
        assert!(layout.is_stale_temp(Path::new("/data/cline_messages.4.tmp"), ".tmp"));
        assert!(!layout.is_stale_temp(Path::new("/data/cline_messages.gz"), ".tmp"));
        assert!(!layout.is_stale_temp(Path::new("/data/unrelated.gz.tmp"), ".tmp"));
    }

    #[test]
    fn meta_wire_format() {
        let meta = ChunkMeta { total_chunks: 3 };
        assert_eq!(meta.encode().unwrap(), br#"{"totalChunks":3}"#);

        let decoded = ChunkMeta::decode(Path::new("m"), br#"{ "totalChunks": 5 }"#).unwrap();
        assert_eq!(decoded.total_chunks, 5);
    }

    #[test]
    fn meta_decode_rejects_garbage() {
        let result = ChunkMeta::decode(Path::new("m"), b"{\"chunks\":1}");
        assert!(matches!(result, Err(StorageError::InvalidMetadata { .. })));

        let result = ChunkMeta::decode(Path::new("m"), b"{\"totalChunks\":-1}");
        assert!(matches!(result, Err(StorageError::InvalidMetadata { .. })));
    }
}
