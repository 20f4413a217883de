//! HTTP fetching with a fixed-delay retry policy.
//!
//! Transient failures (connection errors, 5xx, 429) are retried up to the
//! configured attempt count. Client errors other than 429 fail immediately:
//! a 404 will not heal by waiting.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::warn;
use url::Url;

use corpusync_shared::{Result, RetryConfig, SyncError};

/// User-Agent string for upstream requests.
const USER_AGENT: &str = concat!("Corpusync/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for upstream fetches.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared HTTP client used by all source fetchers.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SyncError::Fetch(format!("failed to build HTTP client: {e}")))
}

/// GET `url`, retrying transient failures per `retry`. Returns the response
/// only once its status is a success.
pub async fn get_with_retry(client: &Client, url: &Url, retry: &RetryConfig) -> Result<String> {
    let attempts = retry.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .text()
                        .await
                        .map_err(|e| SyncError::Fetch(format!("{url}: reading body: {e}")));
                }
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    last_error = format!("HTTP {status}");
                } else {
                    return Err(SyncError::Fetch(format!("{url}: HTTP {status}")));
                }
            }
            Err(e) => last_error = e.to_string(),
        }

        if attempt < attempts {
            warn!(url = %url, attempt, error = %last_error, "fetch failed, retrying");
            tokio::time::sleep(Duration::from_secs(retry.delay_secs)).await;
        }
    }

    Err(SyncError::Fetch(format!(
        "{url}: {last_error} (after {attempts} attempts)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry(attempts: u32) -> RetryConfig {
        RetryConfig {
            attempts,
            delay_secs: 0,
        }
    }

    async fn get(server: &MockServer, retry: &RetryConfig) -> Result<String> {
        let url = Url::parse(&server.uri()).unwrap();
        get_with_retry(&http_client().unwrap(), &url, retry).await
    }

    #[tokio::test]
    async fn server_error_is_retried_until_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let body = get(&server, &fast_retry(3)).await.unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn client_error_fails_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = get(&server, &fast_retry(3)).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn too_many_requests_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("later"))
            .mount(&server)
            .await;

        let body = get(&server, &fast_retry(2)).await.unwrap();
        assert_eq!(body, "later");
    }

    #[tokio::test]
    async fn attempts_exhausted_reports_last_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = get(&server, &fast_retry(3)).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("3 attempts"));
    }
}
