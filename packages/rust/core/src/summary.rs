//! Human-readable rendering of a run summary.

use corpusync_shared::{RunSummary, SourceStatus};

/// Render the end-of-run summary as plain text, one line per source.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut lines = vec!["Sync results".to_string()];

    for report in &summary.reports {
        let line = match &report.status {
            SourceStatus::Completed => {
                let mut line = format!(
                    "  {:<20} ok      deleted {}, uploaded {}",
                    report.source,
                    report.deleted,
                    report.uploads_succeeded()
                );
                if report.uploads_failed() > 0 {
                    line.push_str(&format!(" ({} failed)", report.uploads_failed()));
                }
                line
            }
            SourceStatus::Empty => {
                format!("  {:<20} empty   nothing fetched, store untouched", report.source)
            }
            SourceStatus::Failed(reason) => {
                format!("  {:<20} FAILED  {reason}", report.source)
            }
        };
        lines.push(line);
    }

    lines.push(format!(
        "{} succeeded, {} failed",
        summary.succeeded().len(),
        summary.failed().len()
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusync_shared::{SourceReport, UploadOutcome};

    #[test]
    fn renders_one_line_per_source_plus_totals() {
        let mut summary = RunSummary::default();
        summary.push(SourceReport {
            source: "book".into(),
            status: SourceStatus::Completed,
            deleted: 3,
            uploads: vec![
                UploadOutcome::ok("book_part1.md"),
                UploadOutcome::failed("book_part2.md", "timed out"),
            ],
        });
        summary.push(SourceReport::failed("rose", "HTTP 500"));
        summary.push(SourceReport::empty("video"));

        let text = render_summary(&summary);
        assert!(text.contains("book"));
        assert!(text.contains("deleted 3, uploaded 1 (1 failed)"));
        assert!(text.contains("FAILED  HTTP 500"));
        assert!(text.contains("empty"));
        assert!(text.ends_with("2 succeeded, 1 failed"));
    }
}
