#![forbid(unsafe_code)]
//! dit-core library: the record model, the `.dit` directory store, comment
//! threading, and import reconciliation.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums carrying an [`error::ErrorCode`] on
//!   the store, lock and import paths; `anyhow::Result` for config loading and
//!   git helpers.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`). Binaries call
//!   [`telemetry::init_tracing`] once at startup.

pub mod config;
pub mod error;
pub mod git;
pub mod id;
pub mod import;
pub mod lock;
pub mod model;
pub mod slug;
pub mod store;
pub mod telemetry;
pub mod thread;

pub use error::{ErrorCode, StoreError};
pub use import::{ImportError, ImportReport, Reconciler, UpsertAction, UpsertOutcome};
pub use model::{Comment, Issue, RankingSnapshot, ThreadedComment};
pub use store::{DirStore, Location, MemoryStore, RecordStore, Scope};
pub use thread::thread_comments;
