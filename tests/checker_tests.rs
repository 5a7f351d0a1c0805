//! Integration tests for the proxy checker
//!
//! A wiremock server stands in for a plain HTTP proxy: the checker sends
//! absolute-form requests to it and any GET is answered directly.

use proxy_harvester::proxy::{
    CheckerConfig, Dialer, ProbeError, Proxy, ProxyChecker, ProxyType, ReqwestDialer,
};
use std::net::SocketAddr;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGET: &str = "http://probe.invalid/ip";

fn proxy_for(addr: &SocketAddr) -> Proxy {
    Proxy::new(addr.ip().to_string(), addr.port(), ProxyType::Http)
}

async fn mock_proxy(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string(r#"{"origin":"1.2.3.4"}"#))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_reqwest_dialer_through_http_proxy() {
    let server = mock_proxy(200).await;
    let proxy = proxy_for(server.address());

    let result = ReqwestDialer
        .probe(&proxy, TARGET, Duration::from_secs(5))
        .await;
    assert!(result.is_ok(), "probe failed: {result:?}");
}

#[tokio::test]
async fn test_reqwest_dialer_rejects_error_status() {
    let server = mock_proxy(503).await;
    let proxy = proxy_for(server.address());

    let result = ReqwestDialer
        .probe(&proxy, TARGET, Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(ProbeError::Status(503))));
}

#[tokio::test]
async fn test_validate_against_live_and_dead_proxies() {
    let server = mock_proxy(200).await;
    let live = proxy_for(server.address()).with_source("http://list.example/");
    // Nothing listens on port 1
    let dead = Proxy::new("127.0.0.1".to_string(), 1, ProxyType::Http);

    let config = CheckerConfig::new()
        .with_timeout(Duration::from_secs(5))
        .with_test_url(TARGET.to_string());
    let checker = ProxyChecker::with_config(config);

    let good = checker.validate(vec![dead, live.clone()]).await;

    assert_eq!(good.len(), 1);
    assert_eq!(good[0].host, live.host);
    assert_eq!(good[0].port, live.port);
    assert_eq!(good[0].source_uri, "http://list.example/");
    assert!(good[0].is_validated());
}
