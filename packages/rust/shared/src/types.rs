//! Core domain types shared by the Corpusync pipeline crates.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A bounded-size text artifact ready for upload, with a deterministic
/// filename (`{basename}_part{N}.md` or `{site}_{period}.md`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Display name the document will carry in the store.
    pub filename: String,
    /// Rendered markdown content. Never empty.
    pub content: String,
}

impl Chunk {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteDocument
// ---------------------------------------------------------------------------

/// A document already resident in the external store — the only entity whose
/// state outlives a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    /// Opaque store-side handle used for deletion.
    pub handle: String,
    /// Human-visible display name, matched against chunk filenames.
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// SyncPlan
// ---------------------------------------------------------------------------

/// Computed delete/upload diff for one source's reconciliation.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Stale documents to delete, matched by naming convention.
    pub delete: Vec<RemoteDocument>,
    /// Fresh chunks to upload.
    pub upload: Vec<Chunk>,
}

// ---------------------------------------------------------------------------
// FetchWindow
// ---------------------------------------------------------------------------

/// Fetch-window mode for a run. Changes page ranges and month counts, never
/// pipeline structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchWindow {
    /// Recent items only — the default for scheduled runs.
    Recent,
    /// Everything the source offers.
    FullArchive,
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recent => write!(f, "recent"),
            Self::FullArchive => write!(f, "full-archive"),
        }
    }
}

// ---------------------------------------------------------------------------
// CalendarEvent
// ---------------------------------------------------------------------------

/// One event row scraped from a calendar source, already grouped into a
/// period label by the fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Site the event came from.
    pub site: String,
    /// Period label as shown on the calendar (e.g. `2025.08`).
    pub period: String,
    pub title: String,
    /// Date-range text as displayed, not parsed.
    pub schedule: String,
    pub place: String,
    pub link: Option<String>,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Outcome of one chunk's upload attempt.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub filename: String,
    /// `None` on success, otherwise the failure reason.
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn ok(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            error: None,
        }
    }

    pub fn failed(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            error: Some(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Terminal status of one source's pipeline run.
#[derive(Debug, Clone)]
pub enum SourceStatus {
    /// Fetch, chunking, and reconciliation all ran; uploads may still have
    /// individual failures recorded in the outcomes.
    Completed,
    /// The source produced no records; nothing was reconciled.
    Empty,
    /// Fetch or processing failed before reconciliation.
    Failed(String),
}

/// Per-source report collected by the orchestrator.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub status: SourceStatus,
    /// Documents deleted during the stale-document phase.
    pub deleted: usize,
    /// Per-chunk upload outcomes, in chunk order.
    pub uploads: Vec<UploadOutcome>,
}

impl SourceReport {
    pub fn failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Failed(reason.into()),
            deleted: 0,
            uploads: Vec::new(),
        }
    }

    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Empty,
            deleted: 0,
            uploads: Vec::new(),
        }
    }

    pub fn uploads_succeeded(&self) -> usize {
        self.uploads.iter().filter(|u| u.is_ok()).count()
    }

    pub fn uploads_failed(&self) -> usize {
        self.uploads.len() - self.uploads_succeeded()
    }
}

/// End-of-run summary across all sources.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<SourceReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: SourceReport) {
        self.reports.push(report);
    }

    /// Sources that completed (possibly with per-chunk upload failures).
    pub fn succeeded(&self) -> Vec<&SourceReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, SourceStatus::Completed | SourceStatus::Empty))
            .collect()
    }

    /// Sources that failed before reconciliation.
    pub fn failed(&self) -> Vec<&SourceReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, SourceStatus::Failed(_)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_outcome_counts() {
        let report = SourceReport {
            source: "book".into(),
            status: SourceStatus::Completed,
            deleted: 3,
            uploads: vec![
                UploadOutcome::ok("book_part1.md"),
                UploadOutcome::ok("book_part2.md"),
                UploadOutcome::failed("book_part3.md", "timeout"),
            ],
        };
        assert_eq!(report.uploads_succeeded(), 2);
        assert_eq!(report.uploads_failed(), 1);
    }

    #[test]
    fn summary_partitions_by_status() {
        let mut summary = RunSummary::default();
        summary.push(SourceReport {
            source: "book".into(),
            status: SourceStatus::Completed,
            deleted: 0,
            uploads: vec![],
        });
        summary.push(SourceReport::failed("rose", "HTTP 500"));
        summary.push(SourceReport::empty("video"));

        assert_eq!(summary.succeeded().len(), 2);
        assert_eq!(summary.failed().len(), 1);
    }

    #[test]
    fn fetch_window_display() {
        assert_eq!(FetchWindow::Recent.to_string(), "recent");
        assert_eq!(FetchWindow::FullArchive.to_string(), "full-archive");
    }
}
