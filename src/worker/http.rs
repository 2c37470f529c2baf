//! HTTP client for origin downloads

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::OriginConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Failed to read body: {0}")]
    Body(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(180),
            user_agent: format!("fetchrelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&OriginConfig> for HttpConfig {
    fn from(origin: &OriginConfig) -> Self {
        Self {
            connect_timeout: origin.connect_timeout.as_duration(),
            request_timeout: origin.request_timeout.as_duration(),
            user_agent: origin.user_agent.clone(),
        }
    }
}

/// Origin response with headers read and body still pending
#[derive(Debug)]
pub struct OriginResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    response: reqwest::Response,
}

impl OriginResponse {
    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Read the whole body
    pub async fn bytes(self) -> Result<Bytes> {
        self.response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

/// Origin downloader. One attempt per call; retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: HttpConfig, proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(url) = proxy_url {
            let proxy = Proxy::all(url)
                .map_err(|e| FetchError::InvalidUrl(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// Issue a GET, attaching `If-None-Match` when a validator is known.
    ///
    /// Any HTTP status is returned as a response; only transport failures are errors.
    pub async fn get(&self, url: &str, validator: Option<&str>) -> Result<OriginResponse> {
        debug!(url, conditional = validator.is_some(), "Starting download");

        let mut request = self.client.get(url);
        if let Some(etag) = validator {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_redirect() {
                FetchError::TooManyRedirects
            } else if e.is_builder() {
                FetchError::InvalidUrl(e.to_string())
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let etag = header(ETAG);

        Ok(OriginResponse {
            status: response.status(),
            content_type,
            etag,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(180));
        assert!(config.user_agent.starts_with("fetchrelay/"));
    }

    #[test]
    fn test_http_config_from_origin() {
        let origin = OriginConfig {
            request_timeout: HumanDuration::from_secs(30),
            user_agent: "custom/1.0".to_string(),
            ..OriginConfig::default()
        };
        let config = HttpConfig::from(&origin);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.user_agent, "custom/1.0");
    }
}
