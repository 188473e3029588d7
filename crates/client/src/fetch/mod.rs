//! HTTP fetch pipeline for the offline cache worker.
//!
//! ### Pass-through contract
//! - Non-2xx responses are returned intact, not mapped to errors: the
//!   worker forwards them to the intercepted caller unchanged and only
//!   the caching policy cares about the status code.
//! - Errors are reserved for network-level failures, invalid URLs, and
//!   oversized bodies.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string

pub mod url;

use bytes::Bytes;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve_asset};

// Re-exported so embedders build requests without naming reqwest.
pub use reqwest::{Method, StatusCode, header};

use umbra_core::Error;
use umbra_core::cache::hash::cache_key;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "umbra/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "umbra/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// An intercepted request: the identity the cache is keyed on.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
}

impl FetchRequest {
    /// Build a request with an explicit method.
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    /// Build a GET request.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url }
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// The request-identity key used for cache lookup and storage.
    pub fn cache_key(&self) -> String {
        cache_key(self.method.as_str(), self.url.as_str())
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub body: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Seam between the worker and the network.
///
/// The worker only sees this trait, so tests drive it with stub
/// implementations instead of a live network.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request, returning the response whatever its status.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch a request, returning raw bytes and metadata.
    ///
    /// The response is returned regardless of HTTP status; only timeouts,
    /// connection failures and oversized bodies surface as errors.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let response = self
            .http
            .request(request.method.clone(), url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{}: {}", url, e))
                } else {
                    Error::HttpError(format!("network error: {}", e))
                }
            })?;

        let status = response.status();

        let content_length = response.content_length();
        if let Some(len) = content_length
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            url,
            status.as_u16(),
            fetch_ms,
            body.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, body, headers, fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        FetchClient::fetch(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "umbra/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_request_identity() {
        let a = FetchRequest::get(Url::parse("https://example.com/app.html").unwrap());
        let b = FetchRequest::get(Url::parse("https://example.com/app.html").unwrap());
        assert_eq!(a.cache_key(), b.cache_key());

        let post = FetchRequest::new(Method::POST, Url::parse("https://example.com/app.html").unwrap());
        assert_ne!(a.cache_key(), post.cache_key());
        assert!(a.is_get());
        assert!(!post.is_get());
    }

    #[test]
    fn test_fetch_response_fields() {
        let response = FetchResponse {
            url: Url::parse("https://example.com").unwrap(),
            final_url: Url::parse("https://example.com/redirected").unwrap(),
            status: StatusCode::OK,
            content_type: Some("text/html".to_string()),
            body: Bytes::new(),
            headers: header::HeaderMap::new(),
            fetch_ms: 100,
        };

        assert_eq!(response.url.as_str(), "https://example.com/");
        assert_eq!(response.final_url.as_str(), "https://example.com/redirected");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, Some("text/html".to_string()));
        assert_eq!(response.fetch_ms, 100);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let config = FetchConfig::default();
        let client = FetchClient::new(config);
        assert!(client.is_ok());
    }
}
