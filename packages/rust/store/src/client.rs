//! Remote file-search store client.
//!
//! [`StoreClient`] is the seam between the reconciliation engine and the
//! external store: the engine only ever talks to the trait, so tests inject
//! an in-memory double and production injects [`HttpStoreClient`]. The
//! client is constructed explicitly and passed down — never a module-level
//! singleton.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use corpusync_shared::{RemoteDocument, Result, SyncError};

/// User-Agent string for store requests.
const USER_AGENT: &str = concat!("Corpusync/", env!("CARGO_PKG_VERSION"));

/// Documents fetched per list page.
const LIST_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// StoreClient trait
// ---------------------------------------------------------------------------

/// Handle to a store-side long-running ingest operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    /// Operation resource name, e.g. `operations/abc123`.
    pub name: String,
}

/// Interface to the external document store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Enumerate every document currently in the store.
    async fn list_documents(&self) -> Result<Vec<RemoteDocument>>;

    /// Delete a document by handle. `force` cascades to derived resources.
    async fn delete_document(&self, handle: &str, force: bool) -> Result<()>;

    /// Upload local content under `display_name` and start ingestion.
    /// Returns the long-running operation to poll.
    async fn upload_and_ingest(
        &self,
        path: &Path,
        display_name: &str,
        content_type: &str,
    ) -> Result<OperationHandle>;

    /// Refresh an operation's state. Returns `true` once it reports done.
    async fn refresh(&self, op: &OperationHandle) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// reqwest-backed [`StoreClient`] for the file-search store REST API.
pub struct HttpStoreClient {
    client: Client,
    base_url: String,
    store_name: String,
    api_key: String,
}

impl HttpStoreClient {
    /// Build a client for `store_name` (e.g. `fileSearchStores/abc123`)
    /// under `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        store_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SyncError::Store(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store_name: store_name.into(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.base_url)
    }
}

// Wire types for the store REST surface.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDocument {
    name: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn list_documents(&self) -> Result<Vec<RemoteDocument>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.url(&format!("{}/documents", self.store_name));
            let mut request = self
                .client
                .get(&url)
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| SyncError::Store(format!("list documents: {e}")))?;

            if !response.status().is_success() {
                return Err(SyncError::Store(format!(
                    "list documents: HTTP {}",
                    response.status()
                )));
            }

            let page: ListDocumentsResponse = response
                .json()
                .await
                .map_err(|e| SyncError::Store(format!("list documents: bad payload: {e}")))?;

            documents.extend(page.documents.into_iter().map(|d| RemoteDocument {
                handle: d.name,
                display_name: d.display_name,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn delete_document(&self, handle: &str, force: bool) -> Result<()> {
        let response = self
            .client
            .delete(self.url(handle))
            .header("x-goog-api-key", &self.api_key)
            .query(&[("force", force.to_string())])
            .send()
            .await
            .map_err(|e| SyncError::delete(handle, e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::delete(
                handle,
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn upload_and_ingest(
        &self,
        path: &Path,
        display_name: &str,
        content_type: &str,
    ) -> Result<OperationHandle> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SyncError::io(path, e))?;

        let metadata = serde_json::json!({
            "displayName": display_name,
            "mimeType": content_type,
        });

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(display_name.to_string())
            .mime_str(content_type)
            .map_err(|e| SyncError::upload(display_name, e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .text("metadata", metadata.to_string())
            .part("file", file_part);

        let url = self.url(&format!("{}:uploadToFileSearchStore", self.store_name));
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SyncError::upload(display_name, e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::upload(
                display_name,
                format!("HTTP {}", response.status()),
            ));
        }

        let op: OperationResponse = response
            .json()
            .await
            .map_err(|e| SyncError::upload(display_name, format!("bad payload: {e}")))?;

        Ok(OperationHandle { name: op.name })
    }

    async fn refresh(&self, op: &OperationHandle) -> Result<bool> {
        let response = self
            .client
            .get(self.url(&op.name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("refresh {}: {e}", op.name)))?;

        if !response.status().is_success() {
            return Err(SyncError::Store(format!(
                "refresh {}: HTTP {}",
                op.name,
                response.status()
            )));
        }

        let state: OperationResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Store(format!("refresh {}: bad payload: {e}", op.name)))?;

        Ok(state.done)
    }
}
