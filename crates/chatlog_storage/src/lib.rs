//! # Chatlog Storage
//!
//! Durable local persistence for conversation transcripts.
//!
//! A transcript is an ordered sequence of opaque JSON records that is always
//! saved and loaded as one unit. Two on-disk representations exist:
//!
//! - **Compressed**: a single gzip artifact `<base>.gz` (preferred)
//! - **Chunked**: a metadata artifact `<base>.meta` plus fixed-size slices
//!   `<base>.0 .. <base>.(n-1)` of the uncompressed text
//!
//! ## Design Principles
//!
//! - Saves retry the compressed artifact, then fall back to chunks
//! - Loads prefer the compressed artifact and fall back to chunks
//! - Loads and cleanup never fail; errors are logged through `tracing`
//! - Backends are opaque byte stores with no knowledge of the format
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use chatlog_storage::{InMemoryBackend, LoadSource, StoreConfig, TranscriptStore};
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = TranscriptStore::with_backend(
//!     "/data/cline_messages",
//!     InMemoryBackend::new(),
//!     StoreConfig::default(),
//! )
//! .unwrap();
//!
//! store.save(&[json!({"say": "text", "text": "hi"})]).await.unwrap();
//! let report = store.load_report().await;
//! assert_eq!(report.source, LoadSource::Compressed);
//! assert_eq!(report.records.len(), 1);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
pub mod codec;
mod config;
mod error;
mod file;
pub mod layout;
mod memory;
mod save;
mod store;

pub use backend::StorageBackend;
pub use config::{
    RetryConfig, StoreConfig, DEFAULT_CHUNK_SIZE, DEFAULT_COMPRESSION_LEVEL, MAX_RETRIES,
};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, TEMP_SUFFIX};
pub use layout::{ArtifactLayout, ChunkMeta};
pub use memory::InMemoryBackend;
pub use save::{SaveOutcome, SaveState};
pub use store::{ArtifactSummary, LoadReport, LoadSource, TranscriptStore};

/// One opaque transcript record.
///
/// The store never looks inside a record; any JSON value round-trips.
pub type Record = serde_json::Value;
