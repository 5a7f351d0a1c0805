//! Optional TOML configuration file
//!
//! Every key is optional; missing keys keep the built-in defaults of
//! [`CrawlerConfig`] and [`CheckerConfig`].
//!
//! ```toml
//! [crawler]
//! timeout-secs = 20
//! user-agent = "Mozilla/5.0"
//! accept-invalid-certs = true
//!
//! [checker]
//! timeout-secs = 5
//! concurrency = 64
//! test-url = "http://httpbin.org/ip"
//! mmdb-path = "GeoLite2-City.mmdb"
//! ```

use crate::proxy::{CheckerConfig, CrawlerConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawler: CrawlerSection,
    pub checker: CheckerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerSection {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub accept_invalid_certs: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckerSection {
    pub timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub test_url: Option<String>,
    pub mmdb_path: Option<String>,
}

impl AppConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawler.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "crawler timeout-secs must be > 0".to_string(),
            ));
        }
        if self.checker.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "checker timeout-secs must be > 0".to_string(),
            ));
        }
        if self.checker.concurrency == Some(0) {
            return Err(ConfigError::Validation(
                "checker concurrency must be >= 1".to_string(),
            ));
        }
        if let Some(test_url) = &self.checker.test_url {
            validate_test_url(test_url)?;
        }
        Ok(())
    }

    pub fn crawler_config(&self) -> CrawlerConfig {
        let mut config = CrawlerConfig::default();
        if let Some(secs) = self.crawler.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = &self.crawler.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        if let Some(accept) = self.crawler.accept_invalid_certs {
            config = config.with_accept_invalid_certs(accept);
        }
        config
    }

    pub fn checker_config(&self) -> CheckerConfig {
        let mut config = CheckerConfig::default();
        if let Some(secs) = self.checker.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(concurrency) = self.checker.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(test_url) = &self.checker.test_url {
            config = config.with_test_url(test_url.clone());
        }
        if let Some(path) = &self.checker.mmdb_path {
            config = config.with_mmdb_path(path.clone());
        }
        config
    }
}

/// The probe target must be an absolute http(s) URL
pub fn validate_test_url(test_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(test_url)
        .map_err(|e| ConfigError::Validation(format!("invalid test-url '{test_url}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "test-url must use http or https, got '{other}'"
        ))),
    }
}
