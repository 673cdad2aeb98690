//! Test fixtures and store helpers.
//!
//! Provides temp-dir backed stores and canned record sequences.

use crate::faulty::FaultyBackend;
use chatlog_storage::{FileBackend, Record, StoreConfig, TranscriptStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Base file name used by fixture stores.
pub const FIXTURE_BASE: &str = "cline_messages";

/// A file-backed test store with automatic cleanup.
pub struct TestStore<B = FileBackend> {
    /// The store instance.
    pub store: TranscriptStore<B>,
    /// The temporary directory (kept alive to prevent cleanup).
    pub dir: TempDir,
}

impl TestStore<FileBackend> {
    /// Creates a file-backed store in a fresh temp directory.
    pub fn file(config: StoreConfig) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = TranscriptStore::with_backend(
            dir.path().join(FIXTURE_BASE),
            FileBackend::new(),
            config,
        )
        .expect("Failed to create store");
        Self { store, dir }
    }
}

impl TestStore<FaultyBackend<FileBackend>> {
    /// Creates a file-backed store whose backend can inject failures.
    ///
    /// The returned handle is the same backend the store uses.
    pub fn faulty(config: StoreConfig) -> (Self, Arc<FaultyBackend<FileBackend>>) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let base = dir.path().join(FIXTURE_BASE);
        let backend = Arc::new(FaultyBackend::new(
            FileBackend::new(),
            chatlog_storage::ArtifactLayout::new(&base),
        ));
        let store = TranscriptStore::with_shared_backend(base, Arc::clone(&backend), config)
            .expect("Failed to create store");
        (Self { store, dir }, backend)
    }
}

impl<B> TestStore<B> {
    /// Path of a file inside the store's directory.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Names of every file in the store's directory, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("Failed to read temp directory")
            .map(|entry| {
                entry
                    .expect("Failed to read directory entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

impl<B> std::ops::Deref for TestStore<B> {
    type Target = TranscriptStore<B>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// The single-message transcript `[{"id":1,"text":"hello"}]`.
pub fn hello_records() -> Vec<Record> {
    vec![json!({"id": 1, "text": "hello"})]
}

/// A short but varied transcript resembling agent chat messages.
pub fn sample_records() -> Vec<Record> {
    vec![
        json!({"ts": 1_700_000_000_000_u64, "type": "say", "say": "task", "text": "Refactor the parser"}),
        json!({"ts": 1_700_000_000_500_u64, "type": "ask", "ask": "tool", "text": "{\"tool\":\"readFile\",\"path\":\"src/lib.rs\"}"}),
        json!({"ts": 1_700_000_001_000_u64, "type": "say", "say": "text", "text": "Done ✓", "partial": false}),
        json!({"ts": 1_700_000_002_000_u64, "type": "say", "say": "api_req_started", "images": [], "meta": {"tokensIn": 1200, "tokensOut": 87, "cost": 0.0042}}),
        json!(null),
        json!(["nested", ["arrays", 1, 2.5, true]]),
    ]
}

/// A transcript whose serialized JSON text is exactly `len` bytes.
///
/// The transcript is one string record of `a`s, serialized as `["aaa…"]`.
///
/// # Panics
///
/// Panics if `len < 4`, the size of `[""]`.
pub fn records_with_serialized_len(len: usize) -> Vec<Record> {
    assert!(len >= 4, "smallest single-string transcript is 4 bytes");
    vec![Record::String("a".repeat(len - 4))]
}

/// A transcript of `count` messages, each carrying `text_len` bytes of text.
pub fn bulk_records(count: usize, text_len: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let mut text = format!("{i:06}-");
            while text.len() < text_len {
                text.push_str("lorem ipsum ");
            }
            text.truncate(text_len.max(7));

            json!({
                "id": i,
                "type": if i % 2 == 0 { "say" } else { "ask" },
                "text": text,
            })
        })
        .collect()
}
