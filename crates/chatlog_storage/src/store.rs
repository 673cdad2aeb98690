//! The transcript store: save with retry and fallback, load with fallback,
//! best-effort cleanup.

use crate::backend::StorageBackend;
use crate::codec;
use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::file::{FileBackend, TEMP_SUFFIX};
use crate::layout::{ArtifactLayout, ChunkMeta};
use crate::save::{SaveOutcome, SaveState};
use crate::Record;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Which representation a load was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The compressed artifact.
    Compressed,
    /// The chunked representation.
    Chunked,
    /// Neither representation has any artifact on disk.
    Missing,
    /// Artifacts exist but none of them decode.
    Unrecoverable,
}

/// Result of a load, distinguishing "nothing saved" from "nothing recoverable".
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// The loaded records; empty for `Missing` and `Unrecoverable`.
    pub records: Vec<Record>,
    /// Where the records came from.
    pub source: LoadSource,
}

/// What a transcript currently has on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactSummary {
    /// Size of the compressed artifact, if present.
    pub compressed_bytes: Option<u64>,
    /// Slice count recorded in the metadata artifact, if present and valid.
    pub total_chunks: Option<usize>,
    /// Slice artifacts not covered by the metadata.
    pub orphaned_chunks: usize,
}

/// Durable storage for one transcript.
///
/// A store owns a base path and keeps the record sequence either as a single
/// gzip artifact or, when compressed writes keep failing, as a metadata
/// artifact plus fixed-size slices. See [`crate::layout`] for the layout.
///
/// # Concurrency
///
/// A store assumes one writer and one reader. Calls against the same base
/// path from independent callers must be serialized by the owner.
///
/// # Example
///
/// ```rust
/// use chatlog_storage::{InMemoryBackend, StoreConfig, TranscriptStore};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = TranscriptStore::with_backend(
///     "/history/cline_messages",
///     InMemoryBackend::new(),
///     StoreConfig::default(),
/// )
/// .unwrap();
///
/// let records = vec![json!({"id": 1, "text": "hello"})];
/// store.save(&records).await.unwrap();
/// assert_eq!(store.load().await, records);
/// # });
/// ```
#[derive(Debug)]
pub struct TranscriptStore<B = FileBackend> {
    layout: ArtifactLayout,
    backend: Arc<B>,
    config: StoreConfig,
}

impl TranscriptStore<FileBackend> {
    /// Opens a file-backed store at `base` with the default configuration.
    ///
    /// Nothing is touched on disk until the first save.
    pub fn open(base: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::with_backend(base, FileBackend::new(), StoreConfig::default())
    }
}

impl<B: StorageBackend + 'static> TranscriptStore<B> {
    /// Creates a store over `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if `config` is unusable.
    pub fn with_backend(
        base: impl Into<PathBuf>,
        backend: B,
        config: StoreConfig,
    ) -> StorageResult<Self> {
        Self::with_shared_backend(base, Arc::new(backend), config)
    }

    /// Creates a store over a backend the caller keeps a handle to.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if `config` is unusable.
    pub fn with_shared_backend(
        base: impl Into<PathBuf>,
        backend: Arc<B>,
        config: StoreConfig,
    ) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self {
            layout: ArtifactLayout::new(base),
            backend,
            config,
        })
    }

    /// Returns the artifact layout.
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Returns the base path.
    pub fn base_path(&self) -> &Path {
        self.layout.base()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    async fn blocking<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&B) -> StorageResult<T> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || op(backend.as_ref()))
            .await
            .map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }

    /// Persists the full record sequence.
    ///
    /// Tries the compressed artifact up to `retry.max_attempts` times, then
    /// falls back to the chunked representation. Artifacts of the other
    /// representation are left as they are.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Serialize`] if the records cannot be serialized
    /// - [`StorageError::RetryExhausted`] if every compressed attempt and the
    ///   chunked fallback failed
    pub async fn save(&self, records: &[Record]) -> StorageResult<SaveOutcome> {
        let text = Arc::new(codec::serialize(records)?);
        let max_attempts = self.config.retry.max_attempts;
        let mut state = SaveState::start();

        loop {
            debug!(base = %self.layout.base().display(), state = state.name(), "save step");
            state = match state {
                SaveState::Compressing { attempt } => {
                    let result = self.write_compressed(Arc::clone(&text)).await;
                    if let Err(e) = &result {
                        warn!(
                            path = %self.layout.compressed_path().display(),
                            attempt,
                            max_attempts,
                            error = %e,
                            "compressed save attempt failed"
                        );
                    }
                    SaveState::after_compressed(attempt, max_attempts, result)
                }
                SaveState::Retrying { attempt, error } => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    debug!(attempt, ?delay, error = %error, "retrying compressed save");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    SaveState::Compressing { attempt }
                }
                SaveState::FallingBack { attempts, error } => {
                    warn!(
                        base = %self.layout.base().display(),
                        attempts,
                        error = %error,
                        "compressed save exhausted retries, falling back to chunks"
                    );
                    let result = self.write_chunked(&text).await;
                    if result.is_ok() {
                        self.discard_compressed().await;
                    }
                    SaveState::after_chunked(attempts, result)
                }
                SaveState::Done(outcome) => {
                    debug!(base = %self.layout.base().display(), ?outcome, bytes = text.len(), "saved records");
                    return Ok(outcome);
                }
                SaveState::Failed(e) => {
                    error!(base = %self.layout.base().display(), error = %e, "failed to save records");
                    return Err(e);
                }
            };
        }
    }

    async fn write_compressed(&self, text: Arc<Vec<u8>>) -> StorageResult<()> {
        let path = self.layout.compressed_path();
        let level = self.config.compression_level;

        self.blocking(move |backend| {
            codec::compress(&text, level)
                .and_then(|data| backend.write(&path, &data))
                .map_err(|e| StorageError::compression(path, e))
        })
        .await
    }

    /// Removes an older compressed artifact so it cannot shadow fresh chunks.
    ///
    /// Failures are logged only; the chunked save has already succeeded.
    async fn discard_compressed(&self) {
        let path = self.layout.compressed_path();
        match self.blocking(move |backend| remove_quietly(backend, &path)).await {
            Ok(true) => debug!(base = %self.layout.base().display(), "discarded stale compressed artifact"),
            Ok(false) => {}
            Err(e) => warn!(
                path = %self.layout.compressed_path().display(),
                error = %e,
                "failed to discard stale compressed artifact"
            ),
        }
    }

    /// Writes the metadata artifact, then every slice concurrently.
    ///
    /// Returns the slice count. Waits for every slice write before reporting
    /// the first failure.
    async fn write_chunked(&self, text: &[u8]) -> StorageResult<usize> {
        let chunks = codec::split_chunks(text, self.config.chunk_size);
        let total = chunks.len();

        let meta_path = self.layout.meta_path();
        let meta = ChunkMeta {
            total_chunks: total,
        }
        .encode()?;
        self.blocking(move |backend| {
            backend
                .write(&meta_path, &meta)
                .map_err(|e| StorageError::chunk(meta_path, e))
        })
        .await?;

        let mut writes = JoinSet::new();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            let path = self.layout.chunk_path(index);
            let chunk = chunk.to_vec();
            writes.spawn_blocking(move || {
                backend
                    .write(&path, &chunk)
                    .map_err(|e| StorageError::chunk(path, e))
            });
        }

        let mut first_error = None;
        while let Some(joined) = writes.join_next().await {
            let result = joined.map_err(|e| StorageError::TaskFailed(e.to_string()));
            if let Err(e) = result.and_then(|written| written) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(base = %self.layout.base().display(), chunks = total, "saved records as chunks");
                Ok(total)
            }
        }
    }

    /// Loads the record sequence, preferring the compressed artifact.
    ///
    /// Never fails: returns an empty sequence when nothing is recoverable.
    /// Use [`Self::load_report`] to tell an empty transcript from a lost one.
    pub async fn load(&self) -> Vec<Record> {
        self.load_report().await.records
    }

    /// Loads the record sequence and reports which representation served it.
    pub async fn load_report(&self) -> LoadReport {
        let compressed = self.read_compressed().await;
        let compressed_present = match compressed {
            Ok(Some(records)) => {
                return LoadReport {
                    records,
                    source: LoadSource::Compressed,
                }
            }
            Ok(None) => false,
            Err(e) => {
                warn!(
                    path = %self.layout.compressed_path().display(),
                    error = %e,
                    "compressed transcript unreadable, trying chunks"
                );
                true
            }
        };

        let source = match self.read_chunked().await {
            Ok(Some(records)) => {
                debug!(base = %self.layout.base().display(), records = records.len(), "loaded records from chunks");
                return LoadReport {
                    records,
                    source: LoadSource::Chunked,
                };
            }
            Ok(None) if !compressed_present => {
                debug!(base = %self.layout.base().display(), "no saved transcript");
                LoadSource::Missing
            }
            Ok(None) => {
                error!(base = %self.layout.base().display(), "transcript unrecoverable: no chunk metadata");
                LoadSource::Unrecoverable
            }
            Err(e) => {
                error!(base = %self.layout.base().display(), error = %e, "transcript unrecoverable");
                LoadSource::Unrecoverable
            }
        };

        LoadReport {
            records: Vec::new(),
            source,
        }
    }

    /// Reads the compressed artifact. `Ok(None)` means it does not exist.
    async fn read_compressed(&self) -> StorageResult<Option<Vec<Record>>> {
        let path = self.layout.compressed_path();
        self.blocking(move |backend| {
            let data = match backend.read(&path) {
                Ok(data) => data,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(StorageError::compression(path, e)),
            };
            let text = codec::decompress(&data).map_err(|e| StorageError::compression(&path, e))?;
            codec::parse(&text).map(Some)
        })
        .await
    }

    /// Reads the chunked representation. `Ok(None)` means there is no metadata.
    async fn read_chunked(&self) -> StorageResult<Option<Vec<Record>>> {
        let Some(meta) = self.read_meta().await? else {
            return Ok(None);
        };
        self.check_slices_present(meta).await?;

        let mut reads = JoinSet::new();
        for index in 0..meta.total_chunks {
            let backend = Arc::clone(&self.backend);
            let path = self.layout.chunk_path(index);
            reads.spawn_blocking(move || {
                backend
                    .read(&path)
                    .map(|data| (index, data))
                    .map_err(|e| StorageError::chunk(path, e))
            });
        }

        let mut slices: Vec<Vec<u8>> = vec![Vec::new(); meta.total_chunks];
        let mut first_error = None;
        while let Some(joined) = reads.join_next().await {
            match joined.map_err(|e| StorageError::TaskFailed(e.to_string())) {
                Ok(Ok((index, data))) => slices[index] = data,
                Ok(Err(e)) | Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        codec::parse(&slices.concat()).map(Some)
    }

    /// Fails unless every slice the metadata names is on disk.
    ///
    /// Bounds all later work by the directory listing, not by the recorded count.
    async fn check_slices_present(&self, meta: ChunkMeta) -> StorageResult<()> {
        let layout = self.layout.clone();
        self.blocking(move |backend| {
            let present: BTreeSet<usize> = backend
                .list_dir(layout.dir())?
                .iter()
                .filter_map(|path| layout.chunk_index(path))
                .collect();

            if meta.total_chunks > present.len() {
                return Err(StorageError::InvalidMetadata {
                    path: layout.meta_path(),
                    message: format!(
                        "totalChunks is {} but only {} slices exist",
                        meta.total_chunks,
                        present.len()
                    ),
                });
            }
            match (0..meta.total_chunks).find(|index| !present.contains(index)) {
                Some(index) => {
                    let path = layout.chunk_path(index);
                    Err(StorageError::chunk(&path, StorageError::not_found(&path)))
                }
                None => Ok(()),
            }
        })
        .await
    }

    async fn read_meta(&self) -> StorageResult<Option<ChunkMeta>> {
        let path = self.layout.meta_path();
        self.blocking(move |backend| match backend.read(&path) {
            Ok(data) => ChunkMeta::decode(&path, &data).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(StorageError::chunk(path, e)),
        })
        .await
    }

    /// Deletes every artifact of this transcript. Never fails.
    ///
    /// Removes the compressed artifact, the slices named by the metadata, the
    /// metadata itself, and any slice or temp file left behind by an
    /// interrupted fallback. Missing artifacts are ignored; other failures are
    /// logged and cleanup carries on.
    pub async fn cleanup(&self) {
        let layout = self.layout.clone();
        match self.blocking(move |backend| Ok(remove_all(backend, &layout))).await {
            Ok(0) => debug!(base = %self.layout.base().display(), "cleanup found nothing to remove"),
            Ok(removed) => info!(base = %self.layout.base().display(), removed, "removed transcript artifacts"),
            Err(e) => error!(base = %self.layout.base().display(), error = %e, "error during cleanup"),
        }
    }

    /// Describes the artifacts currently on disk without changing them.
    ///
    /// # Errors
    ///
    /// Returns an error if an artifact exists but cannot be read.
    pub async fn inspect(&self) -> StorageResult<ArtifactSummary> {
        let layout = self.layout.clone();
        self.blocking(move |backend| {
            let compressed_bytes = match backend.read(&layout.compressed_path()) {
                Ok(data) => Some(data.len() as u64),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };

            let meta_path = layout.meta_path();
            let total_chunks = match backend.read(&meta_path) {
                Ok(data) => ChunkMeta::decode(&meta_path, &data)
                    .ok()
                    .map(|meta| meta.total_chunks),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };

            let covered = total_chunks.unwrap_or(0);
            let orphaned_chunks = backend
                .list_dir(layout.dir())?
                .iter()
                .filter_map(|path| layout.chunk_index(path))
                .filter(|index| *index >= covered)
                .count();

            Ok(ArtifactSummary {
                compressed_bytes,
                total_chunks,
                orphaned_chunks,
            })
        })
        .await
    }
}

/// Removes `path`, treating a missing artifact as already removed.
fn remove_quietly<B: StorageBackend + ?Sized>(backend: &B, path: &Path) -> StorageResult<bool> {
    match backend.remove(path) {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Removes every artifact of `layout`, returning how many were removed.
fn remove_all<B: StorageBackend + ?Sized>(backend: &B, layout: &ArtifactLayout) -> usize {
    let mut removed = 0;
    let mut remove = |path: &Path| match remove_quietly(backend, path) {
        Ok(true) => removed += 1,
        Ok(false) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove artifact"),
    };

    remove(&layout.compressed_path());

    let meta_path = layout.meta_path();
    match backend.read(&meta_path) {
        Ok(data) => {
            if let Err(e) = ChunkMeta::decode(&meta_path, &data) {
                warn!(error = %e, "ignoring unreadable chunk metadata");
            }
            remove(&meta_path);
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => warn!(path = %meta_path.display(), error = %e, "failed to read chunk metadata"),
    }

    // Slices are found by listing, so a corrupt count cannot drive the loop.
    match backend.list_dir(layout.dir()) {
        Ok(paths) => {
            for path in paths {
                if layout.chunk_index(&path).is_some() || layout.is_stale_temp(&path, TEMP_SUFFIX) {
                    remove(&path);
                }
            }
        }
        Err(e) => warn!(dir = %layout.dir().display(), error = %e, "failed to scan for chunk artifacts"),
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryBackend, RetryConfig};
    use serde_json::json;
    use std::time::Duration;

    fn memory_store(chunk_size: usize) -> TranscriptStore<InMemoryBackend> {
        TranscriptStore::with_backend(
            "/history/cline_messages",
            InMemoryBackend::new(),
            StoreConfig::new().chunk_size(chunk_size),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_writes_compressed_only() {
        let store = memory_store(1024);
        let records = vec![json!({"id": 1, "text": "hello"})];

        let outcome = store.save(&records).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Compressed { attempts: 1 });
        assert_eq!(
            store.backend().paths(),
            vec![PathBuf::from("/history/cline_messages.gz")]
        );

        let report = store.load_report().await;
        assert_eq!(report.source, LoadSource::Compressed);
        assert_eq!(report.records, records);
    }

    #[tokio::test]
    async fn chunked_write_and_read() {
        let store = memory_store(4);
        let records = vec![json!({"id": 1, "text": "hello"}), json!([1, 2, 3])];
        let text = codec::serialize(&records).unwrap();

        let total = store.write_chunked(&text).await.unwrap();
        assert_eq!(total, codec::chunk_count(text.len(), 4));

        let meta = store
            .backend()
            .read(&store.layout().meta_path())
            .unwrap();
        assert_eq!(ChunkMeta::decode(Path::new("m"), &meta).unwrap().total_chunks, total);

        assert_eq!(store.read_chunked().await.unwrap(), Some(records.clone()));
        let report = store.load_report().await;
        assert_eq!(report.source, LoadSource::Chunked);
        assert_eq!(report.records, records);
    }

    #[tokio::test]
    async fn load_missing_is_distinguished() {
        let store = memory_store(1024);
        let report = store.load_report().await;
        assert_eq!(report.source, LoadSource::Missing);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn load_corrupt_is_unrecoverable() {
        let store = memory_store(1024);
        store
            .backend()
            .write(&store.layout().compressed_path(), b"not gzip")
            .unwrap();

        let report = store.load_report().await;
        assert_eq!(report.source, LoadSource::Unrecoverable);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn missing_slice_is_unrecoverable() {
        let store = memory_store(2);
        store
            .write_chunked(&codec::serialize(&[json!("abcdef")]).unwrap())
            .await
            .unwrap();
        store.backend().remove(&store.layout().chunk_path(1)).unwrap();

        assert_eq!(store.load_report().await.source, LoadSource::Unrecoverable);
    }

    #[tokio::test]
    async fn cleanup_removes_orphans_and_temps() {
        let store = memory_store(1024);
        let backend = store.backend();
        let layout = store.layout();
        backend.write(&layout.chunk_path(0), b"[").unwrap();
        backend.write(&layout.chunk_path(1), b"]").unwrap();
        backend
            .write(Path::new("/history/cline_messages.gz.tmp"), b"partial")
            .unwrap();
        backend
            .write(Path::new("/history/unrelated.0"), b"keep")
            .unwrap();

        let summary = store.inspect().await.unwrap();
        assert_eq!(summary.orphaned_chunks, 2);
        assert_eq!(summary.total_chunks, None);

        store.cleanup().await;
        assert_eq!(
            backend.paths(),
            vec![PathBuf::from("/history/unrelated.0")]
        );
    }

    #[tokio::test]
    async fn cleanup_with_invalid_meta_still_clears() {
        let store = memory_store(1024);
        let backend = store.backend();
        backend.write(&store.layout().meta_path(), b"garbage").unwrap();
        backend.write(&store.layout().chunk_path(0), b"[]").unwrap();

        store.cleanup().await;
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn inspect_reports_both_representations() {
        let store = memory_store(4);
        let records = vec![json!({"id": 1})];
        store.save(&records).await.unwrap();
        store
            .write_chunked(&codec::serialize(&records).unwrap())
            .await
            .unwrap();

        let summary = store.inspect().await.unwrap();
        assert!(summary.compressed_bytes.unwrap() > 0);
        assert_eq!(summary.total_chunks, Some(3));
        assert_eq!(summary.orphaned_chunks, 0);
    }

    fn huge_meta_store() -> TranscriptStore<InMemoryBackend> {
        let store = memory_store(1024);
        let meta = ChunkMeta {
            total_chunks: usize::MAX,
        }
        .encode()
        .unwrap();
        store
            .backend()
            .write(&store.layout().meta_path(), &meta)
            .unwrap();
        store
    }

    #[tokio::test]
    async fn oversized_chunk_count_loads_empty() {
        let store = huge_meta_store();
        store.backend().write(&store.layout().chunk_path(0), b"[]").unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), store.load_report())
            .await
            .expect("load must not walk the recorded chunk count");
        assert_eq!(report.source, LoadSource::Unrecoverable);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn oversized_chunk_count_cleans_up() {
        let store = huge_meta_store();
        store.backend().write(&store.layout().chunk_path(3), b"x").unwrap();

        tokio::time::timeout(Duration::from_secs(5), store.cleanup())
            .await
            .expect("cleanup must not walk the recorded chunk count");
        assert!(store.backend().is_empty());
    }

    #[tokio::test]
    async fn gap_in_slices_is_unrecoverable() {
        let store = memory_store(1024);
        let backend = store.backend();
        let meta = ChunkMeta { total_chunks: 2 }.encode().unwrap();
        backend.write(&store.layout().meta_path(), &meta).unwrap();
        backend.write(&store.layout().chunk_path(0), b"[").unwrap();
        backend.write(&store.layout().chunk_path(5), b"]").unwrap();

        let err = store.read_chunked().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn discarding_compressed_artifact_is_idempotent() {
        let store = memory_store(4);
        let records = vec![json!({"id": 1})];
        store.save(&records).await.unwrap();

        store.discard_compressed().await;
        store.discard_compressed().await;
        assert!(!store.backend().contains(&store.layout().compressed_path()));
    }

    #[test]
    fn invalid_config_rejected() {
        let result = TranscriptStore::with_backend(
            "/t",
            InMemoryBackend::new(),
            StoreConfig::new().retry(RetryConfig::new(0)),
        );
        assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    }
}
