//! Proxy Harvester - Proxy Crawler and Validator
//!
//! Crawls proxy list websites through pluggable sources and validates the
//! harvested proxies concurrently, keeping only the ones that answer.

pub mod config;
pub mod proxy;

pub use config::{AppConfig, ConfigError};
pub use proxy::*;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    /// A source plugin failed while extracting records or follow-up locators
    #[error("source {source_name} failed on {url}: {message}")]
    Source {
        source_name: String,
        url: String,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Geolocation error: {0}")]
    Geo(String),

    #[error("Invalid proxy type: {0}. Use: http, https, socks4, socks5, socks")]
    InvalidProxyType(String),
}

/// Application result type
pub type Result<T> = std::result::Result<T, HarvestError>;
