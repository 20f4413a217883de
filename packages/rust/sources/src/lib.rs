//! Source fetchers for Corpusync.
//!
//! Each fetcher turns one configured upstream into a [`FetchPayload`] the
//! pipeline can chunk and reconcile. The pipeline only sees the
//! [`SourceFetcher`] trait, so tests substitute canned payloads and the
//! calendar crawler can stay an external process.

pub mod api;
pub mod calendar;
pub mod fetch;
pub mod listing;
pub mod xml;

use async_trait::async_trait;
use serde_json::Value;

use corpusync_shared::{CalendarEvent, FetchWindow, Result};

pub use api::ApiSource;
pub use calendar::CalendarSource;
pub use listing::WebSource;

/// What a source produced for one run, along with everything the pipeline
/// needs to chunk it.
#[derive(Debug, Clone)]
pub enum FetchPayload {
    /// Structured records to sort, format, and batch into
    /// `{basename}_part{N}.md` chunks.
    Records {
        basename: String,
        batch_size: usize,
        records: Vec<Value>,
    },
    /// One long document to window into word-bounded chunks.
    Document {
        basename: String,
        title: Option<String>,
        text: String,
        chunk_words: usize,
        overlap_words: usize,
    },
    /// Calendar events to group per period and replace per filename.
    Events {
        site_name: String,
        events: Vec<CalendarEvent>,
    },
}

/// One configured upstream source.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Stable source name used in logs and run summaries.
    fn name(&self) -> &str;

    /// Fetch the source's payload for the given window.
    async fn fetch(&self, window: FetchWindow) -> Result<FetchPayload>;
}
