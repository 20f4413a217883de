//! Shared types, error model, and configuration for Corpusync.
//!
//! This crate is the foundation depended on by all other Corpusync crates.
//! It provides:
//! - [`SyncError`] — the unified error type
//! - Domain types ([`Chunk`], [`RemoteDocument`], [`SyncPlan`], [`RunSummary`])
//! - Configuration ([`AppConfig`] and its source registry, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiSourceConfig, AppConfig, CalendarSourceConfig, PaginationConfig, RetryConfig, StoreConfig,
    WebSourceConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_store,
};
pub use error::{Result, SyncError};
pub use types::{
    CalendarEvent, Chunk, FetchWindow, RemoteDocument, RunSummary, SourceReport, SourceStatus,
    SyncPlan, UploadOutcome,
};
