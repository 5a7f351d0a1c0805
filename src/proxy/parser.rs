//! Proxy parser module for pulling proxy entries out of text

use crate::proxy::models::{Proxy, ProxyType};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static URL_FORMAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?|socks[45]?)://([^:/\s]+):(\d{1,5})/?$")
        .expect("Invalid URL format regex")
});

/// Regex pattern to match IP:PORT patterns in arbitrary markup
static IP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})\b")
        .expect("Invalid IP:PORT regex")
});

/// Regex pattern to match an IP cell followed by a port cell in an HTML table
///
/// The port cell may wrap its number in inline markup such as a link.
static TABLE_CELLS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<td[^>]*>\s*(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\s*</td>\s*<td[^>]*>\s*(?:<[^>]+>\s*)*(\d{1,5})\s*<",
    )
    .expect("Invalid table cells regex")
});

/// Proxy parser for parsing proxies from strings and files
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single proxy line
    ///
    /// Supports formats:
    /// - HOST:PORT
    /// - scheme://HOST:PORT
    pub fn parse_line(line: &str, default_type: ProxyType) -> Option<Proxy> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if line.contains("://") {
            return Self::parse_url_format(line);
        }

        Self::parse_colon_format(line, default_type)
    }

    fn parse_url_format(line: &str) -> Option<Proxy> {
        let caps = URL_FORMAT_REGEX.captures(line)?;
        let proxy_type: ProxyType = caps[1].parse().ok()?;
        let port = parse_port(&caps[3])?;
        Some(Proxy::new(caps[2].to_string(), port, proxy_type))
    }

    fn parse_colon_format(line: &str, default_type: ProxyType) -> Option<Proxy> {
        let (host, port) = line.split_once(':')?;
        let host_chars_ok = host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        if host.is_empty() || !host_chars_ok {
            return None;
        }
        let port = parse_port(port)?;
        Some(Proxy::new(host.to_string(), port, default_type))
    }

    /// Parse proxies from a string (multiple lines)
    pub fn parse_string(content: &str, default_type: ProxyType) -> Vec<Proxy> {
        content
            .lines()
            .filter_map(|line| Self::parse_line(line, default_type))
            .collect()
    }

    /// Extract dotted-quad IP:PORT pairs from arbitrary text such as HTML
    pub fn extract_with_regex(content: &str, default_type: ProxyType) -> Vec<Proxy> {
        capture_pairs(&IP_PORT_REGEX, content, default_type)
            .map(|(_, proxy)| proxy)
            .collect()
    }

    /// Extract proxies from HTML tables that keep the IP and the port in
    /// adjacent cells, as most public proxy-list sites do
    pub fn extract_table_cells(content: &str, default_type: ProxyType) -> Vec<Proxy> {
        capture_pairs(&TABLE_CELLS_REGEX, content, default_type)
            .map(|(_, proxy)| proxy)
            .collect()
    }

    /// Parse page content line by line. When no line parses on its own the
    /// page is treated as markup: table rows and inline `IP:PORT` text are
    /// both extracted, in document order.
    pub fn parse_page(content: &str, default_type: ProxyType) -> Vec<Proxy> {
        let proxies = Self::parse_string(content, default_type);
        if !proxies.is_empty() {
            return proxies;
        }

        let mut found: Vec<(usize, Proxy)> =
            capture_pairs(&TABLE_CELLS_REGEX, content, default_type)
                .chain(capture_pairs(&IP_PORT_REGEX, content, default_type))
                .collect();
        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, proxy)| proxy).collect()
    }

    /// Parse proxies from a file
    pub fn parse_file<P: AsRef<Path>>(path: P, default_type: ProxyType) -> Result<Vec<Proxy>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_string(&content, default_type))
    }
}

/// Host/port captures of `regex` with their offset in `content`
fn capture_pairs<'a>(
    regex: &'a Regex,
    content: &'a str,
    default_type: ProxyType,
) -> impl Iterator<Item = (usize, Proxy)> + 'a {
    regex.captures_iter(content).filter_map(move |cap| {
        let host = cap.get(1)?;
        let valid_octets = host
            .as_str()
            .split('.')
            .all(|part| part.parse::<u32>().map_or(false, |n| n <= 255));
        if !valid_octets {
            return None;
        }
        let port = parse_port(cap.get(2)?.as_str())?;
        let proxy = Proxy::new(host.as_str().to_string(), port, default_type);
        Some((host.start(), proxy))
    })
}

fn parse_port(s: &str) -> Option<u16> {
    s.trim().parse::<u16>().ok().filter(|port| *port != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_format() {
        let proxy = ProxyParser::parse_line("192.168.1.1:8080", ProxyType::Http).unwrap();
        assert_eq!(proxy.host, "192.168.1.1");
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.proxy_type, ProxyType::Http);
        assert_eq!(proxy.speed, Proxy::NOT_VALIDATED);
    }

    #[test]
    fn test_parse_url_format_http() {
        let proxy = ProxyParser::parse_line("http://192.168.1.1:8080", ProxyType::Socks5).unwrap();
        assert_eq!(proxy.host, "192.168.1.1");
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.proxy_type, ProxyType::Http);
    }

    #[test]
    fn test_parse_url_format_socks() {
        let proxy = ProxyParser::parse_line("socks5://192.168.1.1:1080", ProxyType::Http).unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Socks5);

        let proxy = ProxyParser::parse_line("SOCKS://proxy.example.org:1080/", ProxyType::Http).unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Socks);
        assert_eq!(proxy.host, "proxy.example.org");
    }

    #[test]
    fn test_parse_empty_and_comment_lines() {
        assert!(ProxyParser::parse_line("", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("   ", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("# This is a comment", ProxyType::Http).is_none());
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(ProxyParser::parse_line("invalid", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1:abc", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1:0", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1:70000", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("ftp://192.168.1.1:21", ProxyType::Http).is_none());
    }

    #[test]
    fn test_parse_string() {
        let content = r#"
192.168.1.1:8080
# This is a comment
http://192.168.1.3:8080
socks4://10.0.0.1:1080
"#;
        let proxies = ProxyParser::parse_string(content, ProxyType::Http);
        assert_eq!(proxies.len(), 3);
        assert_eq!(proxies[2].proxy_type, ProxyType::Socks4);
    }

    #[test]
    fn test_parse_page_keeps_duplicates() {
        let content = "192.168.1.1:8080\n192.168.1.1:8080\n";
        let proxies = ProxyParser::parse_page(content, ProxyType::Http);
        assert_eq!(proxies.len(), 2);
    }

    #[test]
    fn test_parse_page_from_html_like_content() {
        let content = r#"
<html>
<body>
<table>
<tr><td>192.168.1.1</td><td>8080</td></tr>
</table>
Some text with 10.0.0.1:3128 embedded
</body>
</html>
"#;
        let proxies = ProxyParser::parse_page(content, ProxyType::Http);
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[0].host, "192.168.1.1");
        assert_eq!(proxies[0].port, 8080);
        assert_eq!(proxies[1].host, "10.0.0.1");
        assert_eq!(proxies[1].port, 3128);
    }

    #[test]
    fn test_extract_table_cells_with_markup() {
        let content = r#"
<table class="layui-table">
<tbody>
<tr>
  <td class="show-ip-div">
    45.77.12.8
  </td>
  <td>
    <a href="/?port=3128">3128</a>
  </td>
  <td><a href="/?country=US">United States</a></td>
</tr>
<tr><TD>103.152.112.145</TD><TD>80</TD><TD>ID</TD></tr>
<tr><td>999.1.1.1</td><td>8080</td></tr>
<tr><td>1.1.1.1</td><td>0</td></tr>
</tbody>
</table>
"#;
        let proxies = ProxyParser::extract_table_cells(content, ProxyType::Http);
        let pairs: Vec<_> = proxies.iter().map(|p| (p.host.as_str(), p.port)).collect();
        assert_eq!(pairs, vec![("45.77.12.8", 3128), ("103.152.112.145", 80)]);
    }

    #[test]
    fn test_table_cells_need_adjacent_port_cell() {
        let content = "<tr><td>10.0.0.1</td><td>United States</td><td>8080</td></tr>";
        assert!(ProxyParser::extract_table_cells(content, ProxyType::Http).is_empty());
    }

    #[test]
    fn test_extract_with_regex() {
        let content = "Here is a proxy: 192.168.1.1:8080 and another one 10.0.0.1:3128.";
        let proxies = ProxyParser::extract_with_regex(content, ProxyType::Https);
        assert_eq!(proxies.len(), 2);
        assert!(proxies.iter().all(|p| p.proxy_type == ProxyType::Https));
    }

    #[test]
    fn test_extract_rejects_invalid_ip_and_port() {
        assert!(ProxyParser::extract_with_regex("999.999.999.999:8080", ProxyType::Http).is_empty());
        assert!(ProxyParser::extract_with_regex("192.168.1.1:0", ProxyType::Http).is_empty());
    }
}
