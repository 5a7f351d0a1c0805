//! Proxy crawler module for harvesting proxies from websites
//!
//! This module provides functionality for:
//! - Breadth-first traversal of each source, starting from its seeds
//! - Fetching every locator at most once per crawler, across all sources
//! - Skipping pages that fail to load or answer with a non-200 status

use crate::proxy::fetcher::{Fetcher, HttpFetcher};
use crate::proxy::models::Proxy;
use crate::proxy::source::{ProxySource, DEFAULT_USER_AGENT};
use crate::{HarvestError, Result};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for proxy crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Accept self-signed and otherwise untrusted certificates
    pub accept_invalid_certs: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Locators already claimed by a crawler
///
/// Insertion is an atomic check-and-mark, so sources crawled in parallel
/// against the same set still fetch each locator at most once.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` visited. Returns `false` if it already was.
    pub fn insert(&self, url: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of crawling a single source
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    /// Name of the source that was crawled
    pub source: String,
    /// Records extracted, in page visiting order
    pub proxies: Vec<Proxy>,
    /// Pages fetched with status 200
    pub pages_fetched: usize,
    /// Pages that failed with a network error
    pub pages_failed: usize,
    /// Pages answered with a non-200 status
    pub pages_bad_status: usize,
    /// Locators dropped because they were already visited
    pub duplicates_skipped: usize,
}

impl SourceReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }
}

/// Breadth-first crawler driving proxy sources
pub struct ProxyCrawler<F = HttpFetcher> {
    fetcher: F,
    visited: VisitedSet,
}

impl ProxyCrawler<HttpFetcher> {
    /// Create a new proxy crawler with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(CrawlerConfig::default())
    }

    /// Create a new proxy crawler with custom configuration
    pub fn with_config(config: CrawlerConfig) -> Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::with_config(&config)?))
    }
}

impl<F: Fetcher> ProxyCrawler<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            fetcher,
            visited: VisitedSet::new(),
        }
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Crawl sources in order and return all extracted records
    pub async fn crawl(&self, sources: &[Box<dyn ProxySource>]) -> Result<Vec<Proxy>> {
        let reports = self.crawl_with_reports(sources).await?;
        Ok(reports.into_iter().flat_map(|r| r.proxies).collect())
    }

    /// Crawl sources in order, returning one report per source
    pub async fn crawl_with_reports(
        &self,
        sources: &[Box<dyn ProxySource>],
    ) -> Result<Vec<SourceReport>> {
        let mut reports = Vec::with_capacity(sources.len());
        for source in sources {
            reports.push(self.crawl_source(source.as_ref()).await?);
        }
        Ok(reports)
    }

    /// Breadth-first traversal of one source
    ///
    /// Fails only when the source itself errors; unreachable pages and
    /// non-200 responses contribute nothing and the traversal moves on.
    pub async fn crawl_source(&self, source: &dyn ProxySource) -> Result<SourceReport> {
        let name = source.name();
        let headers = source.custom_headers();
        let charset = source.response_charset().to_string();
        let mut report = SourceReport::new(name);
        let mut frontier: VecDeque<String> = source.seeds().into();

        info!(source = name, seeds = frontier.len(), "crawling source");

        while let Some(url) = frontier.pop_front() {
            // Marked before fetching: a failed page is never retried
            if !self.visited.insert(&url) {
                debug!(source = name, url = %url, "already visited");
                report.duplicates_skipped += 1;
                continue;
            }

            let response = match self.fetcher.fetch(&url, &headers, &charset).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(source = name, error = %e, "fetch failed, skipping");
                    report.pages_failed += 1;
                    continue;
                }
            };

            if !response.is_ok() {
                info!(source = name, url = %url, status = response.status, "skipping page");
                report.pages_bad_status += 1;
                continue;
            }
            report.pages_fetched += 1;

            let proxies = source
                .extract(&response.body)
                .map_err(|e| source_defect(name, &url, e))?;
            debug!(source = name, url = %url, found = proxies.len(), "extracted proxies");
            report
                .proxies
                .extend(proxies.into_iter().map(|p| p.with_source(&url)));

            let links = source
                .next(&response.body, &url)
                .map_err(|e| source_defect(name, &url, e))?;
            frontier.extend(links.into_iter().filter(|link| !self.visited.contains(link)));
        }

        info!(
            source = name,
            proxies = report.proxies.len(),
            fetched = report.pages_fetched,
            failed = report.pages_failed,
            bad_status = report.pages_bad_status,
            "source done"
        );
        Ok(report)
    }
}

fn source_defect(source: &str, url: &str, err: anyhow::Error) -> HarvestError {
    HarvestError::Source {
        source_name: source.to_string(),
        url: url.to_string(),
        message: format!("{err:#}"),
    }
}
