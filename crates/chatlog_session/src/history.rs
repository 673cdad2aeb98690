//! Session-facing message history.

use crate::notifier::{Notifier, TracingNotifier};
use crate::root::StorageRoot;
use chatlog_storage::{
    FileBackend, LoadSource, Record, StorageBackend, StorageResult, StoreConfig, TranscriptStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// File name stem of every artifact a session writes.
pub const MESSAGES_BASENAME: &str = "cline_messages";

/// Warning shown when a save lost data.
pub const SAVE_FAILED_WARNING: &str =
    "Failed to save conversation history. Some messages may be lost.";

/// Base path of the message artifacts under `root`.
pub fn messages_base_path(root: &impl StorageRoot) -> PathBuf {
    root.storage_root().join(MESSAGES_BASENAME)
}

/// Message history of one session.
///
/// Wraps a [`TranscriptStore`] rooted at `<root>/cline_messages` and turns
/// every storage failure into a log line, plus a user warning when a save
/// could not be persisted in any form.
///
/// # Example
///
/// ```rust
/// use chatlog_session::{MessageHistory, RecordingNotifier};
/// use chatlog_storage::{InMemoryBackend, StoreConfig};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let history = MessageHistory::with_backend(
///     std::path::Path::new("/tasks/42"),
///     InMemoryBackend::new(),
///     StoreConfig::default(),
///     RecordingNotifier::new(),
/// )
/// .unwrap();
///
/// history.save_cline_messages(&[json!({"say": "text", "text": "hi"})]).await;
/// assert_eq!(history.load_cline_messages().await.len(), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct MessageHistory<B = FileBackend, N = TracingNotifier> {
    store: Arc<TranscriptStore<B>>,
    notifier: N,
}

impl MessageHistory<FileBackend, TracingNotifier> {
    /// Opens the file-backed history under `root`, warning through `tracing`.
    pub fn open(root: impl StorageRoot) -> StorageResult<Self> {
        Self::with_backend(
            root,
            FileBackend::new(),
            StoreConfig::default(),
            TracingNotifier,
        )
    }
}

impl<B, N> MessageHistory<B, N>
where
    B: StorageBackend + 'static,
    N: Notifier,
{
    /// Creates a history under `root` over `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`chatlog_storage::StorageError::InvalidConfig`] if `config`
    /// is unusable.
    pub fn with_backend(
        root: impl StorageRoot,
        backend: B,
        config: StoreConfig,
        notifier: N,
    ) -> StorageResult<Self> {
        let store = TranscriptStore::with_backend(messages_base_path(&root), backend, config)?;
        Ok(Self::from_store(store, notifier))
    }

    /// Wraps an existing store.
    pub fn from_store(store: TranscriptStore<B>, notifier: N) -> Self {
        Self {
            store: Arc::new(store),
            notifier,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &TranscriptStore<B> {
        &self.store
    }

    /// Returns the notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn base(&self) -> &Path {
        self.store.base_path()
    }

    /// Persists the full message history. Never fails.
    ///
    /// A degraded save (chunked fallback) is logged only. If the fallback
    /// failed too, the user is warned once for this call.
    pub async fn save_cline_messages(&self, records: &[Record]) {
        match self.store.save(records).await {
            Ok(outcome) if outcome.is_degraded() => {
                warn!(base = %self.base().display(), ?outcome, "message history saved in chunked form");
            }
            Ok(outcome) => {
                debug!(base = %self.base().display(), ?outcome, records = records.len(), "saved message history");
            }
            Err(e) if e.is_retry_exhausted() => {
                error!(base = %self.base().display(), error = %e, "failed to save message history");
                self.notifier.warn(SAVE_FAILED_WARNING);
            }
            Err(e) => {
                error!(base = %self.base().display(), error = %e, "failed to save message history");
            }
        }
    }

    /// Loads the message history. Never fails.
    ///
    /// Returns an empty history if nothing was saved or nothing can be
    /// recovered.
    pub async fn load_cline_messages(&self) -> Vec<Record> {
        let store = Arc::clone(&self.store);
        match tokio::spawn(async move { store.load_report().await }).await {
            Ok(report) => {
                if report.source == LoadSource::Unrecoverable {
                    error!(base = %self.base().display(), "message history lost, starting empty");
                } else {
                    debug!(
                        base = %self.base().display(),
                        source = ?report.source,
                        records = report.records.len(),
                        "loaded message history"
                    );
                }
                report.records
            }
            Err(e) => {
                error!(base = %self.base().display(), error = %e, "failed to load message history");
                Vec::new()
            }
        }
    }

    /// Deletes every artifact of the history. Never fails.
    pub async fn cleanup(&self) {
        self.store.cleanup().await;
    }
}
