//! Page fetching for the crawler
//!
//! The crawl targets are arbitrary public proxy-list sites, so the HTTP
//! client accepts any certificate and skips hostname verification. Fetched
//! content is treated as untrusted data either way.

use crate::proxy::crawler::CrawlerConfig;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Transient failure while fetching a crawl locator
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timeout for {url}")]
    Timeout { url: String },

    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Status and decoded body of a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Fetch-a-page capability used by the crawler
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` with the given extra headers.
    ///
    /// `charset` is the encoding used to decode the body when the response
    /// does not declare one.
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        charset: &str,
    ) -> std::result::Result<FetchResponse, FetchError>;
}

/// reqwest-backed fetcher with relaxed TLS trust
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_config(&CrawlerConfig::default())
    }

    pub fn with_config(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .danger_accept_invalid_hostnames(config.accept_invalid_certs)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        charset: &str,
    ) -> std::result::Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(to_header_map(headers))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text_with_charset(charset)
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(url, status, bytes = body.len(), "fetched page");
        Ok(FetchResponse { status, body })
    }
}

fn to_header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "skipping invalid request header"),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_fetcher() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[test]
    fn test_header_map_skips_invalid_entries() {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "text/html".to_string());
        headers.insert("Bad Header".to_string(), "x".to_string());
        let map = to_header_map(&headers);
        assert_eq!(map.len(), 1);
        assert_eq!(map["accept"], "text/html");
    }

    #[test]
    fn test_fetch_response_is_ok() {
        assert!(FetchResponse::new(200, "").is_ok());
        assert!(!FetchResponse::new(204, "").is_ok());
        assert!(!FetchResponse::new(404, "").is_ok());
    }
}
