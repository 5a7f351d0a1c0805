//! Proxy data models

use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proxy type enumeration
///
/// `Socks` is the generic bucket for sources that do not say which SOCKS
/// version they list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
    Socks,
}

impl ProxyType {
    pub fn is_socks(&self) -> bool {
        matches!(self, ProxyType::Socks | ProxyType::Socks4 | ProxyType::Socks5)
    }

    /// Whether a record of this type passes a filter for `filter`.
    ///
    /// Matching is exact, except that a `Socks` filter accepts every SOCKS
    /// variant. Equality between types is unaffected.
    pub fn matches(&self, filter: ProxyType) -> bool {
        match filter {
            ProxyType::Socks => self.is_socks(),
            _ => *self == filter,
        }
    }

    /// Scheme used when dialing through a proxy of this type.
    /// HTTPS proxies are plain HTTP proxies that support CONNECT.
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyType::Http | ProxyType::Https => "http",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 | ProxyType::Socks => "socks5",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyType::Http => write!(f, "http"),
            ProxyType::Https => write!(f, "https"),
            ProxyType::Socks4 => write!(f, "socks4"),
            ProxyType::Socks5 => write!(f, "socks5"),
            ProxyType::Socks => write!(f, "socks"),
        }
    }
}

impl FromStr for ProxyType {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "https" => Ok(ProxyType::Https),
            "socks4" => Ok(ProxyType::Socks4),
            "socks5" => Ok(ProxyType::Socks5),
            "socks" => Ok(ProxyType::Socks),
            _ => Err(HarvestError::InvalidProxyType(s.to_string())),
        }
    }
}

/// A discovered proxy endpoint, validated or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    #[serde(rename = "schema")]
    pub proxy_type: ProxyType,
    /// Measured latency in milliseconds, or a sentinel `<= 0`
    pub speed: i64,
    pub location: Option<String>,
    /// Page the record was extracted from
    #[serde(rename = "sourceURI")]
    pub source_uri: String,
}

impl Proxy {
    /// Speed of a record the checker has not seen yet
    pub const NOT_VALIDATED: i64 = 0;
    /// Speed of a record whose probe failed or timed out
    pub const FAILED: i64 = -1;

    /// Create a new, not yet validated proxy
    pub fn new(host: String, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host,
            port,
            proxy_type,
            speed: Self::NOT_VALIDATED,
            location: None,
            source_uri: String::new(),
        }
    }

    pub fn with_source(mut self, source_uri: &str) -> Self {
        self.source_uri = source_uri.to_string();
        self
    }

    pub fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    /// Whether the checker measured a positive latency for this record
    pub fn is_validated(&self) -> bool {
        self.speed > 0
    }

    /// Get the proxy URL string used for dialing
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.proxy_type.scheme(), self.host, self.port)
    }

    /// Get the proxy string in HOST:PORT format
    pub fn to_simple_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.proxy_type, self.host, self.port)
    }
}

/// Keep only the records whose type passes `filter`
pub fn filter_by_type(proxies: Vec<Proxy>, filter: ProxyType) -> Vec<Proxy> {
    proxies
        .into_iter()
        .filter(|p| p.proxy_type.matches(filter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_creation() {
        let proxy = Proxy::new("127.0.0.1".to_string(), 8080, ProxyType::Http);
        assert_eq!(proxy.host, "127.0.0.1");
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.proxy_type, ProxyType::Http);
        assert_eq!(proxy.speed, Proxy::NOT_VALIDATED);
        assert!(!proxy.is_validated());
        assert!(proxy.location.is_none());
        assert!(proxy.source_uri.is_empty());
    }

    #[test]
    fn test_proxy_url() {
        let proxy = Proxy::new("127.0.0.1".to_string(), 8080, ProxyType::Http);
        assert_eq!(proxy.url(), "http://127.0.0.1:8080");

        let socks = Proxy::new("192.168.1.1".to_string(), 1080, ProxyType::Socks);
        assert_eq!(socks.url(), "socks5://192.168.1.1:1080");
        assert_eq!(socks.to_string(), "socks://192.168.1.1:1080");

        let https = Proxy::new("10.0.0.1".to_string(), 443, ProxyType::Https);
        assert_eq!(https.url(), "http://10.0.0.1:443");
    }

    #[test]
    fn test_proxy_simple_string() {
        let proxy = Proxy::new("127.0.0.1".to_string(), 8080, ProxyType::Http);
        assert_eq!(proxy.to_simple_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_source_does_not_affect_identity_fields() {
        let a = Proxy::new("10.0.0.1".to_string(), 3128, ProxyType::Http).with_source("http://a/");
        let b = Proxy::new("10.0.0.1".to_string(), 3128, ProxyType::Http).with_source("http://b/");
        assert_ne!(a, b);
        assert_eq!(
            (a.host.as_str(), a.port, a.proxy_type),
            (b.host.as_str(), b.port, b.proxy_type)
        );
    }

    #[test]
    fn test_proxy_type_parse() {
        assert_eq!("HTTP".parse::<ProxyType>().unwrap(), ProxyType::Http);
        assert_eq!("socks".parse::<ProxyType>().unwrap(), ProxyType::Socks);
        assert_eq!(" Socks5 ".parse::<ProxyType>().unwrap(), ProxyType::Socks5);
        assert!("ftp".parse::<ProxyType>().is_err());
    }

    #[test]
    fn test_socks_filter_groups_versions() {
        assert!(ProxyType::Socks4.matches(ProxyType::Socks));
        assert!(ProxyType::Socks5.matches(ProxyType::Socks));
        assert!(ProxyType::Socks.matches(ProxyType::Socks));
        assert!(!ProxyType::Http.matches(ProxyType::Socks));

        assert!(!ProxyType::Socks.matches(ProxyType::Socks5));
        assert!(!ProxyType::Https.matches(ProxyType::Http));
        assert_ne!(ProxyType::Socks4, ProxyType::Socks);
    }

    #[test]
    fn test_filter_by_type() {
        let proxies = vec![
            Proxy::new("1.1.1.1".to_string(), 80, ProxyType::Http),
            Proxy::new("2.2.2.2".to_string(), 1080, ProxyType::Socks4),
            Proxy::new("3.3.3.3".to_string(), 1080, ProxyType::Socks5),
        ];
        let socks = filter_by_type(proxies.clone(), ProxyType::Socks);
        assert_eq!(socks.len(), 2);
        let http = filter_by_type(proxies, ProxyType::Http);
        assert_eq!(http.len(), 1);
        assert_eq!(http[0].host, "1.1.1.1");
    }

    #[test]
    fn test_serialized_field_names() {
        let proxy = Proxy::new("1.2.3.4".to_string(), 80, ProxyType::Socks5)
            .with_source("http://example.com/list");
        let value = serde_json::to_value(&proxy).unwrap();
        assert_eq!(value["schema"], "SOCKS5");
        assert_eq!(value["sourceURI"], "http://example.com/list");
        assert_eq!(value["speed"], 0);
        assert!(value["location"].is_null());
    }
}
