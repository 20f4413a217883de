//! HTML web source fetcher: paginated listing boards and single pages.
//!
//! A `list` source walks board pages for the window's page range, collects
//! detail links by href substring, and scrapes each detail page into one
//! record. A `single` source scrapes one page into a long document for
//! word-window chunking.
//!
//! All HTML parsing happens in synchronous helpers: `scraper::Html` is not
//! `Send`, so it must never live across an await point.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use corpusync_normalize::collapse_whitespace;
use corpusync_shared::{FetchWindow, Result, RetryConfig, SyncError, WebSourceConfig};

use crate::fetch::get_with_retry;
use crate::{FetchPayload, SourceFetcher};

/// Fetcher for one `[[web_sources]]` entry.
pub struct WebSource {
    config: WebSourceConfig,
    client: Client,
    retry: RetryConfig,
}

impl WebSource {
    pub fn new(config: WebSourceConfig, client: Client, retry: RetryConfig) -> Self {
        Self {
            config,
            client,
            retry,
        }
    }

    async fn fetch_single(&self) -> Result<FetchPayload> {
        let url = self.base_url()?;
        let body = get_with_retry(&self.client, &url, &self.retry).await?;
        let (title, text) = extract_page(
            &body,
            self.config.content_selector.as_deref(),
            &self.config.remove_selectors,
        )?;

        Ok(FetchPayload::Document {
            basename: self.config.name.clone(),
            title,
            text,
            chunk_words: self.config.chunk_words,
            overlap_words: self.config.overlap_words,
        })
    }

    async fn fetch_list(&self, window: FetchWindow) -> Result<FetchPayload> {
        let pagination = self.config.pagination.as_ref().ok_or_else(|| {
            SyncError::config(format!(
                "{}: list source needs a [pagination] block",
                self.config.name
            ))
        })?;

        // The recent window re-reads the first pages where new posts land;
        // the archive window covers everything behind them.
        let (pages, basename) = match window {
            FetchWindow::Recent => (
                1..=pagination.daily_limit,
                format!("{}_recent", self.config.name),
            ),
            FetchWindow::FullArchive => (
                pagination.daily_limit + 1..=pagination.end_page,
                format!("{}_archive", self.config.name),
            ),
        };

        let base = self.base_url()?;
        let mut links: Vec<Url> = Vec::new();

        for page in pages {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair(&pagination.param, &page.to_string());

            // A dead page loses its own links only, not the whole board.
            let body = match get_with_retry(&self.client, &url, &self.retry).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(page, error = %e, "skipping listing page");
                    continue;
                }
            };

            for href in collect_links(&body, &self.config.link_pattern) {
                match base.join(&href) {
                    Ok(resolved) => {
                        if !links.contains(&resolved) {
                            links.push(resolved);
                        }
                    }
                    Err(e) => warn!(href, error = %e, "skipping unresolvable link"),
                }
            }
        }
        debug!(links = links.len(), "collected detail links");

        let mut records = Vec::new();
        for link in links {
            // One broken article should not sink the whole board.
            match self.fetch_detail(&link).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(url = %link, "detail page had no content"),
                Err(e) => warn!(url = %link, error = %e, "skipping detail page"),
            }
        }

        Ok(FetchPayload::Records {
            basename,
            batch_size: self.config.batch_size,
            records,
        })
    }

    async fn fetch_detail(&self, link: &Url) -> Result<Option<serde_json::Value>> {
        let body = get_with_retry(&self.client, link, &self.retry).await?;
        let (title, text) = extract_page(
            &body,
            self.config.content_selector.as_deref(),
            &self.config.remove_selectors,
        )?;

        let content = collapse_whitespace(&text);
        if content.is_empty() {
            return Ok(None);
        }

        Ok(Some(json!({
            "title": title.unwrap_or_else(|| link.to_string()),
            "url": link.to_string(),
            "content": content,
        })))
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&self.config.url)
            .map_err(|e| SyncError::config(format!("{}: bad url: {e}", self.config.name)))
    }
}

#[async_trait]
impl SourceFetcher for WebSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(skip_all, fields(source = %self.config.name, kind = %self.config.kind))]
    async fn fetch(&self, window: FetchWindow) -> Result<FetchPayload> {
        match self.config.kind.as_str() {
            "single" => self.fetch_single().await,
            "list" => self.fetch_list(window).await,
            other => Err(SyncError::config(format!(
                "{}: unknown web source kind {other:?}",
                self.config.name
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// HTML helpers (synchronous on purpose)
// ---------------------------------------------------------------------------

/// Collect hrefs of anchors whose href contains `pattern`, in document order.
fn collect_links(body: &str, pattern: &str) -> Vec<String> {
    if pattern.is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(body);
    let anchor = match Selector::parse("a[href]") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    document
        .select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(pattern))
        .map(str::to_string)
        .collect()
}

/// Extract `(title, text)` from a page. `content_selector` narrows the text
/// region; `remove_selectors` prunes navigation, ads, and similar subtrees.
/// Paragraph boundaries survive as blank lines.
fn extract_page(
    body: &str,
    content_selector: Option<&str>,
    remove_selectors: &[String],
) -> Result<(Option<String>, String)> {
    let document = Html::parse_document(body);

    let removals = remove_selectors
        .iter()
        .map(|s| parse_selector(s))
        .collect::<Result<Vec<_>>>()?;

    let title = parse_selector("title").ok().and_then(|sel| {
        document
            .select(&sel)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    });

    let region = match content_selector {
        Some(selector) => document.select(&parse_selector(selector)?).next(),
        None => Some(document.root_element()),
    };

    let mut raw = String::new();
    if let Some(region) = region {
        collect_text(region, &removals, &mut raw);
    }

    // Collapse whitespace inside paragraphs, keep blank lines between them.
    let text = raw
        .split("\n\n")
        .map(collapse_whitespace)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok((title, text))
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| SyncError::config(format!("bad CSS selector {selector:?}: {e:?}")))
}

fn collect_text(element: ElementRef<'_>, removals: &[Selector], out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if matches!(name, "script" | "style" | "noscript" | "head") {
                continue;
            }
            if removals.iter().any(|sel| sel.matches(&child_el)) {
                continue;
            }
            collect_text(child_el, removals, out);
            if is_block(name) {
                out.push_str("\n\n");
            }
        }
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "tr"
            | "br"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}
