//! Proxy module for harvesting and validating proxies
//!
//! This module provides functionality for:
//! - Crawling proxy websites through pluggable sources
//! - Parsing proxy entries out of fetched pages
//! - Checking proxy validity concurrently with bounded in-flight probes
//! - Persisting harvested records

pub mod checker;
pub mod crawler;
pub mod fetcher;
pub mod geo;
pub mod models;
pub mod parser;
pub mod source;
pub mod store;

pub use checker::{rank, CheckerConfig, Dialer, ProbeError, ProxyChecker, ReqwestDialer};
pub use crawler::{CrawlerConfig, ProxyCrawler, SourceReport, VisitedSet};
pub use fetcher::{FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use models::{filter_by_type, Proxy, ProxyType};
pub use parser::ProxyParser;
pub use source::{builtin_sources, source_by_name, ListSource, ProxySource};
pub use store::{load_records, save_records};
