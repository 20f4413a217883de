//! Store reconciliation engine.
//!
//! Makes the store's documents under a logical prefix exactly match a
//! freshly computed chunk set: list & match, delete stale documents, pause,
//! then upload fresh chunks on a bounded worker pool with per-chunk
//! operation polling.
//!
//! This is an at-least-once, non-atomic reconciliation. A crash mid-run can
//! leave the store with only some new chunks and/or undeleted stale ones;
//! the next run's full replace restores consistency. Concurrent overlapping
//! runs are not safe — the caller must enforce a single-runner discipline.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use corpusync_shared::{
    Chunk, RemoteDocument, Result, StoreConfig, SyncError, SyncPlan, UploadOutcome,
};

use crate::client::StoreClient;

/// Content type every chunk is ingested under.
pub const CHUNK_CONTENT_TYPE: &str = "text/markdown";

// ---------------------------------------------------------------------------
// Options & report
// ---------------------------------------------------------------------------

/// How stale documents are matched against a fresh chunk set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Whole-prefix replace: every document named `{basename}_part…` is
    /// stale. Used by record-batch sources.
    Prefix,
    /// Per-filename replace: only documents whose display name equals a
    /// fresh chunk filename are stale. Calendar sources use this so periods
    /// outside the current crawl window are left untouched.
    Exact,
}

/// Reconciliation tuning, usually derived from `[store]` config.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Interval between polls of a pending ingest operation.
    pub poll_interval: Duration,
    /// Per-chunk budget for the operation to report done.
    pub max_wait: Duration,
    /// Width of the upload worker pool.
    pub upload_workers: usize,
    /// Pause between delete completion and the first upload.
    pub delete_settle: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(120),
            upload_workers: 5,
            delete_settle: Duration::from_secs(2),
        }
    }
}

impl From<&StoreConfig> for ReconcileOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_wait: Duration::from_secs(config.max_wait_secs),
            upload_workers: config.upload_workers,
            delete_settle: Duration::from_secs(config.delete_settle_secs),
        }
    }
}

/// Aggregated outcome of one source's reconciliation.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Stale documents successfully deleted.
    pub deleted: usize,
    /// Stale documents whose delete failed (logged, non-fatal).
    pub delete_failures: usize,
    /// Per-chunk upload outcomes, in chunk order.
    pub uploads: Vec<UploadOutcome>,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Compute the delete/upload diff for one source: which existing documents
/// are stale under `mode`, and which chunks go up.
pub fn plan(
    basename: &str,
    mode: MatchMode,
    existing: &[RemoteDocument],
    fresh: Vec<Chunk>,
) -> SyncPlan {
    let stale: Vec<RemoteDocument> = match mode {
        MatchMode::Prefix => {
            let prefix = format!("{basename}_part");
            existing
                .iter()
                .filter(|doc| doc.display_name.starts_with(&prefix))
                .cloned()
                .collect()
        }
        MatchMode::Exact => existing
            .iter()
            .filter(|doc| fresh.iter().any(|c| c.filename == doc.display_name))
            .cloned()
            .collect(),
    };

    SyncPlan {
        delete: stale,
        upload: fresh,
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Per-source reconciliation engine over an injected [`StoreClient`].
pub struct Reconciler {
    client: Arc<dyn StoreClient>,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(client: Arc<dyn StoreClient>, options: ReconcileOptions) -> Self {
        Self { client, options }
    }

    /// Replace the store's documents for `basename` with `chunks`.
    ///
    /// Every per-document and per-chunk failure is recorded in the report
    /// rather than propagated; only listing the store fails the call.
    #[instrument(skip_all, fields(basename, chunks = chunks.len()))]
    pub async fn reconcile(
        &self,
        basename: &str,
        mode: MatchMode,
        chunks: Vec<Chunk>,
    ) -> Result<ReconcileReport> {
        let existing = self.client.list_documents().await?;
        let plan = plan(basename, mode, &existing, chunks);

        info!(
            stale = plan.delete.len(),
            fresh = plan.upload.len(),
            "reconciling store documents"
        );

        let mut report = ReconcileReport::default();

        // Delete phase. Failures only risk a duplicate-looking document
        // until the next run.
        for doc in &plan.delete {
            match self.client.delete_document(&doc.handle, true).await {
                Ok(()) => {
                    debug!(display_name = %doc.display_name, "deleted stale document");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(display_name = %doc.display_name, error = %e, "delete failed");
                    report.delete_failures += 1;
                }
            }
        }

        // Let the store settle before re-uploading under the same names.
        if !plan.delete.is_empty() && !self.options.delete_settle.is_zero() {
            tokio::time::sleep(self.options.delete_settle).await;
        }

        // Upload phase: bounded pool, independent outcomes.
        let semaphore = Arc::new(Semaphore::new(self.options.upload_workers.max(1)));
        let mut handles = Vec::new();

        for chunk in plan.upload {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let poll_interval = self.options.poll_interval;
            let max_wait = self.options.max_wait;
            let filename = chunk.filename.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                upload_chunk(client.as_ref(), &chunk, poll_interval, max_wait).await
            });
            handles.push((filename, handle));
        }

        for (filename, handle) in handles {
            match handle.await {
                Ok(outcome) => report.uploads.push(outcome),
                Err(e) => report
                    .uploads
                    .push(UploadOutcome::failed(filename, format!("task failed: {e}"))),
            }
        }

        info!(
            deleted = report.deleted,
            delete_failures = report.delete_failures,
            uploaded = report.uploads.iter().filter(|u| u.is_ok()).count(),
            upload_failures = report.uploads.iter().filter(|u| !u.is_ok()).count(),
            "reconcile complete"
        );

        Ok(report)
    }
}

/// Upload one chunk and poll its ingest operation to completion.
async fn upload_chunk(
    client: &dyn StoreClient,
    chunk: &Chunk,
    poll_interval: Duration,
    max_wait: Duration,
) -> UploadOutcome {
    match try_upload(client, chunk, poll_interval, max_wait).await {
        Ok(()) => {
            debug!(filename = %chunk.filename, "upload complete");
            UploadOutcome::ok(&chunk.filename)
        }
        Err(e) => {
            warn!(filename = %chunk.filename, error = %e, "upload failed");
            UploadOutcome::failed(&chunk.filename, e.to_string())
        }
    }
}

async fn try_upload(
    client: &dyn StoreClient,
    chunk: &Chunk,
    poll_interval: Duration,
    max_wait: Duration,
) -> Result<()> {
    // Spool the chunk to a transient file. The handle drops (and the file is
    // removed) on every exit path, including timeouts.
    let mut spool =
        NamedTempFile::new().map_err(|e| SyncError::upload(&chunk.filename, e.to_string()))?;
    spool
        .write_all(chunk.content.as_bytes())
        .and_then(|_| spool.flush())
        .map_err(|e| SyncError::upload(&chunk.filename, e.to_string()))?;

    let op = client
        .upload_and_ingest(spool.path(), &chunk.filename, CHUNK_CONTENT_TYPE)
        .await?;

    let started = Instant::now();
    loop {
        if client.refresh(&op).await? {
            return Ok(());
        }
        if started.elapsed() >= max_wait {
            // The remote side may still finish the operation later; we only
            // abandon it locally.
            return Err(SyncError::UploadTimeout {
                filename: chunk.filename.clone(),
                waited_secs: max_wait.as_secs(),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::client::OperationHandle;

    /// In-memory store double. Uploads insert documents immediately;
    /// operations for display names listed in `stuck` never report done.
    #[derive(Default)]
    struct MockStore {
        docs: Mutex<Vec<RemoteDocument>>,
        next_id: AtomicUsize,
        stuck: Vec<String>,
        fail_deletes: bool,
    }

    impl MockStore {
        fn seeded(names: &[&str]) -> Self {
            let docs = names
                .iter()
                .enumerate()
                .map(|(i, name)| RemoteDocument {
                    handle: format!("documents/seed-{i}"),
                    display_name: name.to_string(),
                })
                .collect();
            Self {
                docs: Mutex::new(docs),
                next_id: AtomicUsize::new(0),
                stuck: Vec::new(),
                fail_deletes: false,
            }
        }

        fn display_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self
                .docs
                .lock()
                .unwrap()
                .iter()
                .map(|d| d.display_name.clone())
                .collect();
            names.sort();
            names
        }
    }

    #[async_trait]
    impl StoreClient for MockStore {
        async fn list_documents(&self) -> Result<Vec<RemoteDocument>> {
            Ok(self.docs.lock().unwrap().clone())
        }

        async fn delete_document(&self, handle: &str, _force: bool) -> Result<()> {
            if self.fail_deletes {
                return Err(SyncError::delete(handle, "permission denied"));
            }
            self.docs.lock().unwrap().retain(|d| d.handle != handle);
            Ok(())
        }

        async fn upload_and_ingest(
            &self,
            path: &Path,
            display_name: &str,
            _content_type: &str,
        ) -> Result<OperationHandle> {
            // The spool file must exist and be non-empty at upload time.
            let content = std::fs::read_to_string(path)
                .map_err(|e| SyncError::upload(display_name, e.to_string()))?;
            assert!(!content.is_empty());

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.docs.lock().unwrap().push(RemoteDocument {
                handle: format!("documents/up-{id}"),
                display_name: display_name.to_string(),
            });
            Ok(OperationHandle {
                name: format!("operations/{display_name}"),
            })
        }

        async fn refresh(&self, op: &OperationHandle) -> Result<bool> {
            let name = op.name.trim_start_matches("operations/");
            Ok(!self.stuck.iter().any(|s| s == name))
        }
    }

    fn fast_options() -> ReconcileOptions {
        ReconcileOptions {
            poll_interval: Duration::from_millis(5),
            max_wait: Duration::from_millis(30),
            upload_workers: 5,
            delete_settle: Duration::ZERO,
        }
    }

    fn chunks(names: &[&str]) -> Vec<Chunk> {
        names
            .iter()
            .map(|n| Chunk::new(*n, format!("content of {n}\n")))
            .collect()
    }

    #[test]
    fn plan_prefix_matches_whole_part_family() {
        let existing = vec![
            RemoteDocument {
                handle: "d/1".into(),
                display_name: "book_part1.md".into(),
            },
            RemoteDocument {
                handle: "d/2".into(),
                display_name: "book_part7.md".into(),
            },
            RemoteDocument {
                handle: "d/3".into(),
                display_name: "rose_part1.md".into(),
            },
        ];

        let plan = plan("book", MatchMode::Prefix, &existing, chunks(&["book_part1.md"]));
        assert_eq!(plan.delete.len(), 2);
        assert!(plan.delete.iter().all(|d| d.display_name.starts_with("book_part")));
    }

    #[test]
    fn plan_exact_leaves_unmatched_names_alone() {
        let existing = vec![
            RemoteDocument {
                handle: "d/1".into(),
                display_name: "Concert_2025_07.md".into(),
            },
            RemoteDocument {
                handle: "d/2".into(),
                display_name: "Concert_2025_08.md".into(),
            },
        ];

        let fresh = chunks(&["Concert_2025_08.md", "Concert_2025_09.md"]);
        let plan = plan("Concert", MatchMode::Exact, &existing, fresh);

        assert_eq!(plan.delete.len(), 1);
        assert_eq!(plan.delete[0].display_name, "Concert_2025_08.md");
    }

    #[tokio::test]
    async fn prefix_replace_deletes_old_parts_and_uploads_fresh() {
        let store = Arc::new(MockStore::seeded(&[
            "book_part1.md",
            "book_part2.md",
            "book_part3.md",
            "book_part4.md",
            "book_part5.md",
            "rose_part1.md",
        ]));
        let reconciler = Reconciler::new(store.clone(), fast_options());

        let report = reconciler
            .reconcile(
                "book",
                MatchMode::Prefix,
                chunks(&["book_part1.md", "book_part2.md", "book_part3.md"]),
            )
            .await
            .unwrap();

        assert_eq!(report.deleted, 5);
        assert_eq!(report.delete_failures, 0);
        assert_eq!(report.uploads.len(), 3);
        assert!(report.uploads.iter().all(|u| u.is_ok()));

        assert_eq!(
            store.display_names(),
            vec!["book_part1.md", "book_part2.md", "book_part3.md", "rose_part1.md"]
        );
    }

    #[tokio::test]
    async fn exact_mode_preserves_stale_periods() {
        let store = Arc::new(MockStore::seeded(&[
            "Concert_2025_07.md",
            "Concert_2025_08.md",
        ]));
        let reconciler = Reconciler::new(store.clone(), fast_options());

        let report = reconciler
            .reconcile(
                "Concert",
                MatchMode::Exact,
                chunks(&["Concert_2025_08.md", "Concert_2025_09.md"]),
            )
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(
            store.display_names(),
            vec![
                "Concert_2025_07.md",
                "Concert_2025_08.md",
                "Concert_2025_09.md"
            ]
        );
    }

    #[tokio::test]
    async fn back_to_back_reconcile_is_idempotent() {
        let store = Arc::new(MockStore::default());
        let reconciler = Reconciler::new(store.clone(), fast_options());
        let fresh = chunks(&["book_part1.md", "book_part2.md"]);

        reconciler
            .reconcile("book", MatchMode::Prefix, fresh.clone())
            .await
            .unwrap();
        reconciler
            .reconcile("book", MatchMode::Prefix, fresh)
            .await
            .unwrap();

        // Exactly one document per filename, no duplicates.
        assert_eq!(store.display_names(), vec!["book_part1.md", "book_part2.md"]);
    }

    #[tokio::test]
    async fn one_stuck_operation_times_out_without_affecting_others() {
        let mut store = MockStore::default();
        store.stuck.push("book_part2.md".into());
        let store = Arc::new(store);

        let reconciler = Reconciler::new(store.clone(), fast_options());
        let report = reconciler
            .reconcile(
                "book",
                MatchMode::Prefix,
                chunks(&["book_part1.md", "book_part2.md", "book_part3.md"]),
            )
            .await
            .unwrap();

        let by_name = |name: &str| {
            report
                .uploads
                .iter()
                .find(|u| u.filename == name)
                .unwrap()
                .clone()
        };

        assert!(by_name("book_part1.md").is_ok());
        assert!(by_name("book_part3.md").is_ok());

        let stuck = by_name("book_part2.md");
        assert!(!stuck.is_ok());
        assert!(stuck.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn delete_failures_are_recorded_not_fatal() {
        let mut store = MockStore::seeded(&["book_part1.md"]);
        store.fail_deletes = true;
        let store = Arc::new(store);

        let reconciler = Reconciler::new(store.clone(), fast_options());
        let report = reconciler
            .reconcile("book", MatchMode::Prefix, chunks(&["book_part1.md"]))
            .await
            .unwrap();

        assert_eq!(report.deleted, 0);
        assert_eq!(report.delete_failures, 1);
        // Upload still ran.
        assert_eq!(report.uploads.len(), 1);
        assert!(report.uploads[0].is_ok());
    }

    #[tokio::test]
    async fn empty_chunk_set_only_deletes() {
        let store = Arc::new(MockStore::seeded(&["book_part1.md"]));
        let reconciler = Reconciler::new(store.clone(), fast_options());

        let report = reconciler
            .reconcile("book", MatchMode::Prefix, vec![])
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(report.uploads.is_empty());
        assert!(store.display_names().is_empty());
    }
}
