//! Application configuration for Corpusync.
//!
//! User config lives at `~/.corpusync/corpusync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "corpusync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".corpusync";

// ---------------------------------------------------------------------------
// Config structs (matching corpusync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote store connection and reconcile tuning.
    #[serde(default)]
    pub store: StoreConfig,

    /// Upstream fetch retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Structured open-data endpoints.
    #[serde(default)]
    pub api_sources: Vec<ApiSourceConfig>,

    /// HTML listing / single-page sources.
    #[serde(default)]
    pub web_sources: Vec<WebSourceConfig>,

    /// Calendar sites (events arrive through the fetcher boundary).
    #[serde(default)]
    pub calendar_sources: Vec<CalendarSourceConfig>,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store resource name, e.g. `fileSearchStores/abc123`.
    #[serde(default)]
    pub name: String,

    /// Base URL of the store API.
    #[serde(default = "default_store_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Seconds between polls of a pending ingest operation.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-chunk budget for an ingest operation to report done.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Width of the bounded upload worker pool.
    #[serde(default = "default_upload_workers")]
    pub upload_workers: usize,

    /// Pause between the delete phase and the first upload.
    #[serde(default = "default_delete_settle")]
    pub delete_settle_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_url: default_store_base_url(),
            api_key_env: default_api_key_env(),
            poll_interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
            upload_workers: default_upload_workers(),
            delete_settle_secs: default_delete_settle(),
        }
    }
}

fn default_store_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_poll_interval() -> u64 {
    1
}
fn default_max_wait() -> u64 {
    120
}
fn default_upload_workers() -> usize {
    5
}
fn default_delete_settle() -> u64 {
    2
}

/// `[retry]` section — applies to upstream fetches, not store calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts before the fetch is surfaced as failed.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Fixed delay between attempts.
    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_secs: default_retry_delay(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    2
}

/// `[[api_sources]]` entry — one structured open-data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSourceConfig {
    /// Basename for the source's chunk files.
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// Env var holding the service key, if the endpoint needs one.
    #[serde(default)]
    pub key_env: Option<String>,
    /// Records per chunk file.
    #[serde(default = "default_api_batch_size")]
    pub batch_size: usize,
}

fn default_api_batch_size() -> usize {
    100
}

/// `[[web_sources]]` entry — a listing board or a single content page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSourceConfig {
    pub name: String,
    pub url: String,

    /// `list` (paginated board with detail links) or `single`.
    #[serde(default = "default_web_kind")]
    pub kind: String,

    /// Substring a detail-page href must contain (list sources).
    #[serde(default)]
    pub link_pattern: String,

    /// CSS selector for the content region of a detail page.
    #[serde(default)]
    pub content_selector: Option<String>,

    /// CSS selectors removed from the content region before extraction.
    #[serde(default)]
    pub remove_selectors: Vec<String>,

    /// Pagination settings for list sources.
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,

    /// Records per chunk file.
    #[serde(default = "default_web_batch_size")]
    pub batch_size: usize,

    /// Words per chunk for single-page sources.
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Trailing words carried into the next chunk for context.
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
}

fn default_web_kind() -> String {
    "single".into()
}
fn default_web_batch_size() -> usize {
    40
}
fn default_chunk_words() -> usize {
    500
}
fn default_overlap_words() -> usize {
    50
}

/// Pagination block for listing sources. The recent window reads pages
/// `1..=daily_limit`; the full archive reads `daily_limit+1..=end_page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Query parameter carrying the page number.
    #[serde(default = "default_page_param")]
    pub param: String,
    /// Last page of the full archive.
    pub end_page: u32,
    /// Pages covered by a recent-window run.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

fn default_page_param() -> String {
    "nPage".into()
}
fn default_daily_limit() -> u32 {
    3
}

/// `[[calendar_sources]]` entry — a JavaScript-rendered calendar site.
/// Crawling happens in an external collaborator; the pipeline consumes its
/// events and owns the per-period replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSourceConfig {
    /// Site name; sanitized into the chunk filename prefix.
    pub site_name: String,
    pub url: String,
    /// Months a full-archive run walks through.
    #[serde(default = "default_months")]
    pub months_to_collect: u32,
    /// Months a recent-window run walks through.
    #[serde(default = "default_recent_months")]
    pub recent_months: u32,

    /// File where the external crawler drops its event export (JSON array of
    /// events). The pipeline reads events from here rather than driving a
    /// browser itself.
    #[serde(default)]
    pub events_file: Option<PathBuf>,
}

fn default_months() -> u32 {
    12
}
fn default_recent_months() -> u32 {
    3
}

impl CalendarSourceConfig {
    /// Month count for the given fetch window.
    pub fn months_for(&self, window: crate::types::FetchWindow) -> u32 {
        match window {
            crate::types::FetchWindow::Recent => self.recent_months,
            crate::types::FetchWindow::FullArchive => self.months_to_collect,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.corpusync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.corpusync/corpusync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the store is configured and its API key env var is set.
pub fn validate_store(config: &AppConfig) -> Result<()> {
    if config.store.name.is_empty() {
        return Err(SyncError::config(
            "store.name is empty — set it to your file search store resource name",
        ));
    }

    let var_name = &config.store.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(SyncError::config(format!(
            "store API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchWindow;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("poll_interval_secs"));
        assert!(toml_str.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.store.max_wait_secs, 120);
        assert_eq!(parsed.store.upload_workers, 5);
        assert_eq!(parsed.retry.attempts, 3);
    }

    #[test]
    fn config_with_sources() {
        let toml_str = r#"
[store]
name = "fileSearchStores/abc123"

[[api_sources]]
name = "book"
url = "https://data.example.org/openapi/book"
key_env = "BOOK_KEY"

[[web_sources]]
name = "parknews"
url = "https://example.org/board?bid=0045"
kind = "list"
link_pattern = "act=view"

[web_sources.pagination]
end_page = 135
daily_limit = 3

[[calendar_sources]]
site_name = "Concert"
url = "https://example.org/events"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.api_sources.len(), 1);
        assert_eq!(config.api_sources[0].batch_size, 100);
        assert_eq!(config.web_sources[0].batch_size, 40);
        let pagination = config.web_sources[0].pagination.as_ref().unwrap();
        assert_eq!(pagination.param, "nPage");
        assert_eq!(pagination.end_page, 135);
        assert_eq!(config.calendar_sources[0].months_to_collect, 12);
    }

    #[test]
    fn calendar_months_follow_window() {
        let cal = CalendarSourceConfig {
            site_name: "Concert".into(),
            url: "https://example.org/events".into(),
            months_to_collect: 12,
            recent_months: 3,
            events_file: None,
        };
        assert_eq!(cal.months_for(FetchWindow::Recent), 3);
        assert_eq!(cal.months_for(FetchWindow::FullArchive), 12);
    }

    #[test]
    fn store_validation_requires_name() {
        let config = AppConfig::default();
        let result = validate_store(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("store.name"));
    }
}
