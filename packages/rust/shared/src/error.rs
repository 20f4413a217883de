//! Error types for Corpusync.
//!
//! Library crates use [`SyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Propagation policy: everything below is caught at the orchestrator or
//! reconciliation boundary. No error from one source's processing aborts
//! the remaining sources in a run.

use std::path::PathBuf;

/// Top-level error type for all Corpusync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Upstream fetch failed after exhausting retries, or a 4xx client error.
    /// Aborts only the current source.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Malformed or empty upstream payload. The source is skipped, non-fatal.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Chunk generation failed. Fatal to the current source only; should not
    /// occur on well-formed input.
    #[error("chunking error: {0}")]
    Chunking(String),

    /// A single chunk's upload failed. Per-chunk, aggregated, non-fatal to
    /// the run.
    #[error("upload error for {filename}: {message}")]
    Upload { filename: String, message: String },

    /// A chunk's ingest operation did not complete within the wait budget.
    /// The remote side may still finish it later.
    #[error("upload timed out for {filename} after {waited_secs}s")]
    UploadTimeout { filename: String, waited_secs: u64 },

    /// A stale document could not be deleted. Logged only; risks a
    /// duplicate-looking document until the next run.
    #[error("delete error for {handle}: {message}")]
    Delete { handle: String, message: String },

    /// Remote store API error outside the upload/delete phases.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an upload error tagged with the chunk's filename.
    pub fn upload(filename: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Upload {
            filename: filename.into(),
            message: msg.into(),
        }
    }

    /// Create a delete error tagged with the document handle.
    pub fn delete(handle: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Delete {
            handle: handle.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is fatal to the source currently being processed
    /// (as opposed to a per-chunk or per-document outcome).
    pub fn is_source_fatal(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::Parse { .. } | Self::Chunking(_) | Self::Store(_)
        )
    }
}
