//! Proxy sources: the site-specific side of a crawl
//!
//! A source supplies seed locators, pulls proxy records out of fetched
//! pages, and optionally points the crawler at further pages to visit.

use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::parser::ProxyParser;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Default user agent for page requests
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_CHARSET: &str = "utf-8";

/// Browser-like headers sent unless a source overrides them
///
/// No `User-Agent` here: the crawler's configured agent is the default,
/// and a source that needs a different one returns it from
/// [`ProxySource::custom_headers`].
pub fn default_headers() -> HashMap<String, String> {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Cache-Control", "no-cache"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// A pluggable, site-specific scraper
///
/// Errors returned from [`extract`](ProxySource::extract) or
/// [`next`](ProxySource::next) are treated as defects in the source and
/// abort the crawl.
pub trait ProxySource: Send + Sync {
    fn name(&self) -> &str;

    /// Locators the traversal starts from, in visiting order
    fn seeds(&self) -> Vec<String>;

    /// Proxy records found on a fetched page
    fn extract(&self, page: &str) -> anyhow::Result<Vec<Proxy>>;

    /// Follow-up locators found on the page fetched from `page_url`
    fn next(&self, _page: &str, _page_url: &str) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn custom_headers(&self) -> HashMap<String, String> {
        default_headers()
    }

    fn response_charset(&self) -> &str {
        DEFAULT_CHARSET
    }
}

/// Generic source for plain-text or HTML proxy lists
#[derive(Debug, Clone)]
pub struct ListSource {
    name: String,
    seeds: Vec<String>,
    proxy_type: ProxyType,
    follow: Option<Regex>,
    charset: String,
}

impl ListSource {
    pub fn new(name: &str, seeds: &[&str], proxy_type: ProxyType) -> Self {
        Self {
            name: name.to_string(),
            seeds: seeds.iter().map(|s| s.to_string()).collect(),
            proxy_type,
            follow: None,
            charset: DEFAULT_CHARSET.to_string(),
        }
    }

    /// Follow links matched by `pattern`; capture group 1, or the whole
    /// match if there is no group, is resolved against the page locator.
    pub fn with_follow(mut self, pattern: Regex) -> Self {
        self.follow = Some(pattern);
        self
    }

    pub fn with_charset(mut self, charset: &str) -> Self {
        self.charset = charset.to_string();
        self
    }

    pub fn proxy_type(&self) -> ProxyType {
        self.proxy_type
    }
}

impl ProxySource for ListSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn seeds(&self) -> Vec<String> {
        self.seeds.clone()
    }

    fn extract(&self, page: &str) -> anyhow::Result<Vec<Proxy>> {
        Ok(ProxyParser::parse_page(page, self.proxy_type))
    }

    fn next(&self, page: &str, page_url: &str) -> anyhow::Result<Vec<String>> {
        let Some(follow) = &self.follow else {
            return Ok(Vec::new());
        };
        let base = Url::parse(page_url)?;

        let mut links = Vec::new();
        for cap in follow.captures_iter(page) {
            let Some(raw) = cap.get(1).or_else(|| cap.get(0)) else {
                continue;
            };
            let href = raw.as_str().replace("&amp;", "&");
            // Malformed hrefs are page content, not a source defect
            if let Ok(link) = base.join(&href) {
                links.push(link.to_string());
            }
        }
        Ok(links)
    }

    fn response_charset(&self) -> &str {
        &self.charset
    }
}

/// Names of the built-in sources, in registry order
pub const BUILTIN_SOURCE_NAMES: &[&str] = &[
    "free-proxy-list.net",
    "sslproxies",
    "us-proxy.org",
    "socks-proxy.net",
    "freeproxy.world",
    "speedx-socks5",
];

/// Construct a built-in source by name
pub fn source_by_name(name: &str) -> Option<Box<dyn ProxySource>> {
    let source = match name {
        "free-proxy-list.net" => {
            ListSource::new(name, &["https://free-proxy-list.net/"], ProxyType::Http)
        }
        "sslproxies" => ListSource::new(name, &["https://www.sslproxies.org/"], ProxyType::Https),
        "us-proxy.org" => ListSource::new(name, &["https://www.us-proxy.org/"], ProxyType::Http),
        "socks-proxy.net" => {
            ListSource::new(name, &["https://www.socks-proxy.net/"], ProxyType::Socks4)
        }
        "freeproxy.world" => ListSource::new(
            name,
            &["https://www.freeproxy.world/?type=http&page=1"],
            ProxyType::Http,
        )
        .with_follow(
            Regex::new(r#"href="(\?type=http(?:&amp;|&)page=\d+)""#).ok()?,
        ),
        "speedx-socks5" => ListSource::new(
            name,
            &["https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt"],
            ProxyType::Socks5,
        ),
        _ => return None,
    };
    Some(Box::new(source))
}

/// All built-in sources, in registry order
pub fn builtin_sources() -> Vec<Box<dyn ProxySource>> {
    BUILTIN_SOURCE_NAMES
        .iter()
        .filter_map(|name| source_by_name(name))
        .collect()
}
