//! Shared utilities for integration testing.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ifconfig_rs::attributes::HostnameLookup;
use ifconfig_rs::config::AppConfig;
use ifconfig_rs::http::HttpServer;
use ifconfig_rs::net::{BoundListener, ProxyProtocolListener};

/// Answers every reverse lookup with a fixed name.
pub struct StubLookup(pub &'static str);

#[async_trait]
impl HostnameLookup for StubLookup {
    async fn reverse(&self, _ip: IpAddr) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[allow(dead_code)]
pub fn test_server() -> HttpServer {
    test_server_with(AppConfig::default())
}

pub fn test_server_with(config: AppConfig) -> HttpServer {
    HttpServer::with_lookup(Arc::new(config), Arc::new(StubLookup("client.test.")))
}

/// Serve `server` on a fresh loopback port and return its address.
#[allow(dead_code)]
pub async fn start_plain(server: &HttpServer) -> SocketAddr {
    let listener = BoundListener::plain("127.0.0.1", 0).await.unwrap();
    let addr = listener.local_addr();
    let router = server.router();
    tokio::spawn(async move {
        let _ = listener.serve(router).await;
    });
    addr
}

/// Serve `server` behind a PROXY-protocol listener on a fresh loopback port.
#[allow(dead_code)]
pub async fn start_proxy_protocol(server: &HttpServer, header_timeout: Duration) -> SocketAddr {
    let listener = ProxyProtocolListener::bind("127.0.0.1:0".parse().unwrap(), header_timeout)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let router = server.router();
    tokio::spawn(async move {
        let _ = listener.serve(router).await;
    });
    addr
}

/// Write a self-signed certificate for `localhost` into `dir`.
#[allow(dead_code)]
pub fn write_self_signed(dir: &Path) -> (PathBuf, PathBuf) {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();
    (cert_path, key_path)
}

/// A loopback port that was free a moment ago.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// GET `path` with the given user agent.
#[allow(dead_code)]
pub async fn get(addr: SocketAddr, path: &str, ua: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("http://{addr}{path}"))
        .header(reqwest::header::USER_AGENT, ua)
        .send()
        .await
        .unwrap()
}
