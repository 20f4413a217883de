//! Calendar source: events exported by the external crawler.
//!
//! Calendar sites render their schedules with JavaScript, so a headless
//! browser collects the events and writes them to a JSON file. This fetcher
//! reads that export and keeps only the periods inside the run's window;
//! periods outside it are left alone in the store by the per-filename
//! replace.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, instrument};

use corpusync_shared::{CalendarEvent, CalendarSourceConfig, FetchWindow, Result, SyncError};

use crate::{FetchPayload, SourceFetcher};

/// Fetcher for one `[[calendar_sources]]` entry.
pub struct CalendarSource {
    config: CalendarSourceConfig,
}

impl CalendarSource {
    pub fn new(config: CalendarSourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceFetcher for CalendarSource {
    fn name(&self) -> &str {
        &self.config.site_name
    }

    #[instrument(skip_all, fields(source = %self.config.site_name))]
    async fn fetch(&self, window: FetchWindow) -> Result<FetchPayload> {
        let path = self.config.events_file.as_ref().ok_or_else(|| {
            SyncError::config(format!(
                "{}: events_file is not set — point it at the crawler's export",
                self.config.site_name
            ))
        })?;

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::io(path, e))?;
        let events: Vec<CalendarEvent> = serde_json::from_str(&content)
            .map_err(|e| SyncError::parse(format!("bad events export: {e}")))?;

        let months = self.config.months_for(window);
        let allowed = period_window(Utc::now().date_naive(), months);
        let events: Vec<CalendarEvent> = events
            .into_iter()
            .filter(|e| allowed.contains(&e.period))
            .collect();
        debug!(events = events.len(), months, "loaded calendar events");

        Ok(FetchPayload::Events {
            site_name: self.config.site_name.clone(),
            events,
        })
    }
}

/// Period labels (`YYYY.MM`) for `months` consecutive months starting at
/// `start`'s month.
fn period_window(start: NaiveDate, months: u32) -> Vec<String> {
    let mut labels = Vec::with_capacity(months as usize);
    let mut year = start.year();
    let mut month = start.month();

    for _ in 0..months {
        labels.push(format!("{year}.{month:02}"));
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    labels
}
