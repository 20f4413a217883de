//! The per-source pipeline and the run loop over all sources.
//!
//! Sources run sequentially; one source's failure never aborts the rest.
//! Each source is fetched, normalized, chunked, and reconciled against the
//! store, producing a [`SourceReport`].

use chrono::Utc;
use tracing::{info, instrument, warn};

use corpusync_chunker::{batch_chunks, chunk_paragraphs, group_events_by_period, split_paragraphs};
use corpusync_normalize::{format_record, sort_by_date};
use corpusync_shared::{
    AppConfig, Chunk, FetchWindow, Result, RunSummary, SourceReport, SourceStatus,
};
use corpusync_sources::fetch::http_client;
use corpusync_sources::{ApiSource, CalendarSource, FetchPayload, SourceFetcher, WebSource};
use corpusync_store::{MatchMode, Reconciler};

/// Which configured source families a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFamily {
    Api,
    Web,
    Calendar,
}

impl SourceFamily {
    pub const ALL: [SourceFamily; 3] = [Self::Api, Self::Web, Self::Calendar];
}

/// Build fetchers for every configured source in the selected families,
/// in config order: API, then web, then calendar.
pub fn build_fetchers(
    config: &AppConfig,
    families: &[SourceFamily],
) -> Result<Vec<Box<dyn SourceFetcher>>> {
    let client = http_client()?;
    let mut fetchers: Vec<Box<dyn SourceFetcher>> = Vec::new();

    if families.contains(&SourceFamily::Api) {
        for source in &config.api_sources {
            fetchers.push(Box::new(ApiSource::new(
                source.clone(),
                client.clone(),
                config.retry.clone(),
            )));
        }
    }
    if families.contains(&SourceFamily::Web) {
        for source in &config.web_sources {
            fetchers.push(Box::new(WebSource::new(
                source.clone(),
                client.clone(),
                config.retry.clone(),
            )));
        }
    }
    if families.contains(&SourceFamily::Calendar) {
        for source in &config.calendar_sources {
            fetchers.push(Box::new(CalendarSource::new(source.clone())));
        }
    }

    Ok(fetchers)
}

/// Run every fetcher through the pipeline and collect the summary.
#[instrument(skip_all, fields(window = %window, sources = fetchers.len()))]
pub async fn run_sync(
    fetchers: &[Box<dyn SourceFetcher>],
    window: FetchWindow,
    reconciler: &Reconciler,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for fetcher in fetchers {
        info!(source = fetcher.name(), "syncing source");
        summary.push(run_source(fetcher.as_ref(), window, reconciler).await);
    }
    summary
}

async fn run_source(
    fetcher: &dyn SourceFetcher,
    window: FetchWindow,
    reconciler: &Reconciler,
) -> SourceReport {
    let name = fetcher.name().to_string();

    let payload = match fetcher.fetch(window).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(source = %name, error = %e, "fetch failed");
            return SourceReport::failed(&name, e.to_string());
        }
    };

    let (basename, mode, chunks) = match prepare_chunks(payload) {
        Ok(Some(prepared)) => prepared,
        Ok(None) => {
            info!(source = %name, "source produced nothing, leaving store untouched");
            return SourceReport::empty(&name);
        }
        Err(e) => return SourceReport::failed(&name, e.to_string()),
    };
    info!(source = %name, chunks = chunks.len(), "chunks prepared");

    match reconciler.reconcile(&basename, mode, chunks).await {
        Ok(report) => SourceReport {
            source: name,
            status: SourceStatus::Completed,
            deleted: report.deleted,
            uploads: report.uploads,
        },
        Err(e) => SourceReport::failed(&name, e.to_string()),
    }
}

/// Turn a payload into named chunks plus the match mode its reconciliation
/// uses. `None` means the source was empty and must not touch the store.
fn prepare_chunks(payload: FetchPayload) -> Result<Option<(String, MatchMode, Vec<Chunk>)>> {
    match payload {
        FetchPayload::Records {
            basename,
            batch_size,
            mut records,
        } => {
            if records.is_empty() {
                return Ok(None);
            }
            sort_by_date(&mut records);
            let blocks: Vec<String> = records.iter().map(format_record).collect();
            let chunks = batch_chunks(&blocks, &basename, batch_size)?;
            Ok(Some((basename, MatchMode::Prefix, chunks)))
        }
        FetchPayload::Document {
            basename,
            title,
            text,
            chunk_words,
            overlap_words,
        } => {
            let paragraphs = split_paragraphs(&text);
            if paragraphs.is_empty() {
                return Ok(None);
            }
            let blocks =
                chunk_paragraphs(&paragraphs, title.as_deref(), chunk_words, overlap_words)?;
            // One windowed chunk per file.
            let chunks = batch_chunks(&blocks, &basename, 1)?;
            Ok(Some((basename, MatchMode::Prefix, chunks)))
        }
        FetchPayload::Events { site_name, events } => {
            if events.is_empty() {
                return Ok(None);
            }
            let chunks = group_events_by_period(&events, &site_name, Utc::now());
            Ok(Some((site_name, MatchMode::Exact, chunks)))
        }
    }
}
