//! Run orchestration for Corpusync.
//!
//! Wires configured sources to the normalize → chunk → reconcile pipeline
//! and aggregates per-source reports into a run summary.

pub mod pipeline;
pub mod summary;

pub use pipeline::{SourceFamily, build_fetchers, run_sync};
pub use summary::render_summary;
