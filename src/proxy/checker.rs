//! Proxy checker module for checking proxy validity
//!
//! Every candidate is probed independently: a request to a known-good
//! target is routed through the proxy and the round trip is timed. Probes
//! run concurrently up to a fixed in-flight limit, each under its own
//! deadline, and the run returns once every probe has finished or expired.

use crate::proxy::geo::GeoLocator;
use crate::proxy::models::Proxy;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Proxy as ReqwestProxy};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default timeout for proxy checks in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks
const DEFAULT_CONCURRENCY: usize = 10;

/// Default URL to test proxies against
const DEFAULT_TEST_URL: &str = "http://httpbin.org/ip";

/// Why a single probe failed
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status: {0}")]
    Status(u16),
}

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each proxy check
    pub timeout: Duration,
    /// Maximum number of probes in flight
    pub concurrency: usize,
    /// URL to test proxies against
    pub test_url: String,
    /// Path to MMDB file for geolocation (optional)
    pub mmdb_path: Option<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            test_url: DEFAULT_TEST_URL.to_string(),
            mmdb_path: None,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_mmdb_path(mut self, path: String) -> Self {
        self.mmdb_path = Some(path);
        self
    }
}

/// Dial-through-a-proxy capability used by the checker
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Fetch `target` through `proxy`, succeeding once the full response
    /// has arrived with a success status
    async fn probe(
        &self,
        proxy: &Proxy,
        target: &str,
        timeout: Duration,
    ) -> Result<(), ProbeError>;
}

/// reqwest-backed dialer, one client per probe
#[derive(Debug, Clone, Default)]
pub struct ReqwestDialer;

#[async_trait]
impl Dialer for ReqwestDialer {
    async fn probe(
        &self,
        proxy: &Proxy,
        target: &str,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        let reqwest_proxy =
            ReqwestProxy::all(proxy.url()).map_err(|e| ProbeError::Connect(e.to_string()))?;

        let client = Client::builder()
            .proxy(reqwest_proxy)
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        let response = client.get(target).send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }
        response.bytes().await.map_err(classify)?;
        Ok(())
    }
}

fn classify(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout
    } else {
        ProbeError::Connect(err.to_string())
    }
}

/// Proxy checker for validating proxies
pub struct ProxyChecker<D = ReqwestDialer> {
    config: CheckerConfig,
    dialer: D,
    geo_locator: Option<GeoLocator>,
}

impl ProxyChecker<ReqwestDialer> {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self::with_dialer(config, ReqwestDialer)
    }
}

impl Default for ProxyChecker<ReqwestDialer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dialer> ProxyChecker<D> {
    pub fn with_dialer(config: CheckerConfig, dialer: D) -> Self {
        let geo_locator = config.mmdb_path.as_ref().and_then(|path| {
            GeoLocator::from_path(path)
                .map_err(|e| warn!(path = %path, error = %e, "geolocation disabled"))
                .ok()
        });

        Self {
            config,
            dialer,
            geo_locator,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Probe a single proxy and return it with its speed set
    pub async fn check_proxy(&self, mut proxy: Proxy) -> Proxy {
        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.config.timeout,
            self.dialer
                .probe(&proxy, &self.config.test_url, self.config.timeout),
        )
        .await
        .unwrap_or(Err(ProbeError::Timeout));

        match outcome {
            Ok(()) => {
                let elapsed = start.elapsed().as_millis().max(1);
                proxy.speed = i64::try_from(elapsed).unwrap_or(i64::MAX);
                debug!(proxy = %proxy, speed = proxy.speed, "proxy works");
                self.annotate_location(&mut proxy);
            }
            Err(e) => {
                debug!(proxy = %proxy, error = %e, "proxy failed");
                proxy.speed = Proxy::FAILED;
            }
        }
        proxy
    }

    fn annotate_location(&self, proxy: &mut Proxy) {
        if proxy.location.is_some() {
            return;
        }
        if let Some(ref geo) = self.geo_locator {
            if let Ok(location) = geo.lookup(&proxy.host) {
                proxy.location = location.hint();
            }
        }
    }

    /// Check every proxy and return them all, annotated, in input order
    pub async fn check_proxies(&self, proxies: Vec<Proxy>) -> Vec<Proxy> {
        self.check_proxies_until(proxies, std::future::pending()).await
    }

    /// Like [`check_proxies`](Self::check_proxies), but stops when
    /// `shutdown` resolves. Outstanding probes are dropped and only the
    /// proxies checked so far are returned.
    pub async fn check_proxies_until<S>(&self, proxies: Vec<Proxy>, shutdown: S) -> Vec<Proxy>
    where
        S: Future<Output = ()>,
    {
        let total = proxies.len();
        let probes = stream::iter(proxies.into_iter().enumerate())
            .map(|(index, proxy)| async move { (index, self.check_proxy(proxy).await) })
            .buffer_unordered(self.config.concurrency.max(1));

        tokio::pin!(probes);
        tokio::pin!(shutdown);
        let mut checked = Vec::with_capacity(total);
        loop {
            tokio::select! {
                next = probes.next() => match next {
                    Some(result) => checked.push(result),
                    None => break,
                },
                _ = &mut shutdown => {
                    warn!(checked = checked.len(), total, "validation interrupted");
                    break;
                }
            }
        }

        checked.sort_by_key(|(index, _)| *index);
        checked.into_iter().map(|(_, proxy)| proxy).collect()
    }

    /// Check every proxy and return the working ones, ordered by [`rank`]
    pub async fn validate(&self, proxies: Vec<Proxy>) -> Vec<Proxy> {
        self.validate_until(proxies, std::future::pending()).await
    }

    /// Validate until `shutdown` resolves, keeping whatever passed so far
    pub async fn validate_until<S>(&self, proxies: Vec<Proxy>, shutdown: S) -> Vec<Proxy>
    where
        S: Future<Output = ()>,
    {
        let total = proxies.len();
        let good = rank(self.check_proxies_until(proxies, shutdown).await);
        info!(total, working = good.len(), "validation finished");
        good
    }
}

/// Drop records without a positive speed and order the rest by speed,
/// highest first. Equal speeds keep their input order.
pub fn rank(proxies: Vec<Proxy>) -> Vec<Proxy> {
    let mut good: Vec<Proxy> = proxies.into_iter().filter(Proxy::is_validated).collect();
    good.sort_by(|a, b| b.speed.cmp(&a.speed));
    good
}
