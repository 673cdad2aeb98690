//! # Chatlog Session
//!
//! Binds a transcript store to one task's storage root.
//!
//! This crate provides:
//! - [`MessageHistory`], the session-facing save/load/cleanup surface
//! - [`StorageRoot`] for hosts that hand out per-task directories
//! - [`Notifier`] for the one user-visible warning a lost save produces
//!
//! ## Failure policy
//!
//! Session calls never fail. Save errors are logged; the user is warned only
//! when the chunked fallback failed too, since that is the only case where
//! messages are actually lost. Load returns an empty history when nothing
//! can be recovered.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod history;
mod notifier;
mod root;

pub use history::{messages_base_path, MessageHistory, MESSAGES_BASENAME, SAVE_FAILED_WARNING};
pub use notifier::{Notifier, RecordingNotifier, TracingNotifier};
pub use root::StorageRoot;

pub use chatlog_storage::Record;
