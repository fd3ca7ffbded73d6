//! Outbound fetch of source images.
//!
//! The previewer acts as a proxy: the query string and headers of the
//! inbound request are replayed on the request sent to the source.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName};

/// Headers that describe the inbound connection rather than the request.
static SKIPPED_HEADERS: [HeaderName; 9] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::ACCEPT_ENCODING,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
    header::TRAILER,
    header::PROXY_AUTHORIZATION,
];

/// Failure to obtain source bytes.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed
    #[error("http request error: {0}")]
    Request(#[source] reqwest::Error),

    /// The source answered with a non-success status
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        /// Status returned by the source
        status: StatusCode,
        /// URL that was requested
        url: String,
    },

    /// The response body could not be read
    #[error("unable to read image from response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The fetch did not finish within the time budget
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Parts of the inbound request that are forwarded to the source.
#[derive(Debug, Clone, Default)]
pub struct Forwarded {
    /// Inbound headers
    pub headers: HeaderMap,
    /// Inbound query pairs, in order
    pub query: Vec<(String, String)>,
}

/// Capability to download a source image.
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch the bytes at `url`, replaying `forwarded` on the outbound request.
    fn fetch(
        &self,
        url: &str,
        forwarded: &Forwarded,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// [`Fetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
}

impl ProxyClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Fetcher for ProxyClient {
    fn fetch(
        &self,
        url: &str,
        forwarded: &Forwarded,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        let url = with_scheme(url);
        let headers = forwardable_headers(&forwarded.headers);
        let request = self
            .client
            .get(&url)
            .query(&forwarded.query)
            .headers(headers);

        async move {
            let response = request.send().await.map_err(FetchError::Request)?;

            tracing::debug!("Proxy: OUT='GET {}' -> {}", response.url(), response.status());

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::UnexpectedStatus {
                    status,
                    url: response.url().to_string(),
                });
            }

            let bytes = response.bytes().await.map_err(FetchError::Body)?;
            Ok(bytes.to_vec())
        }
    }
}

/// Prefix `http://` when the source has no scheme.
pub fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Inbound headers minus the connection-specific ones.
fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    for name in &SKIPPED_HEADERS {
        headers.remove(name);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_with_scheme() {
        assert_eq!(with_scheme("example.com/a.jpg"), "http://example.com/a.jpg");
        assert_eq!(with_scheme("http://example.com/a.jpg"), "http://example.com/a.jpg");
        assert_eq!(with_scheme("https://example.com/a.jpg"), "https://example.com/a.jpg");
    }

    #[test]
    fn test_connection_headers_are_dropped() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("previewer.local"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        inbound.insert("x-request-id", HeaderValue::from_static("42"));

        let out = forwardable_headers(&inbound);

        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::CONNECTION).is_none());
        assert_eq!(out.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(out.get("x-request-id").unwrap(), "42");
    }

    #[tokio::test]
    async fn test_unreachable_source_is_request_error() {
        let client = ProxyClient::new(Duration::from_secs(2));
        // Port 9 on loopback has nothing listening
        let result = client
            .fetch("http://127.0.0.1:9/photo.jpg", &Forwarded::default())
            .await;

        assert!(matches!(result, Err(FetchError::Request(_))));
    }
}
