//! # Chatlog Testkit
//!
//! Test utilities for chatlog.
//!
//! This crate provides:
//! - Temp-dir backed store fixtures and canned transcripts
//! - A fault-injecting backend for retry and fallback scenarios
//! - Property-based test generators using proptest
//! - One-time tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatlog_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn falls_back_to_chunks() {
//!     let (store, backend) = TestStore::faulty(StoreConfig::default());
//!     backend.fail_compressed_writes(3);
//!     store.save(&hello_records()).await.unwrap();
//!     assert_eq!(store.load().await, hello_records());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use chatlog_storage::{
        LoadSource, Record, RetryConfig, SaveOutcome, StorageBackend, StoreConfig,
    };
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;

static TRACING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`. Output goes through the test
/// writer so it is captured unless `--nocapture` is given.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
