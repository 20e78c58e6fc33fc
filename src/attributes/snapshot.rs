//! Serializable view of the inbound request, for the `request` and
//! `headers` diagnostics.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::{header, request::Parts, HeaderMap};
use serde::Serialize;

/// Header name to every value sent under it.
pub type HeaderValues = BTreeMap<String, Vec<String>>;

/// The raw request as the server received it.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub uri: String,
    pub proto: String,
    pub host: String,
    pub remote_addr: Option<String>,
    pub content_length: Option<u64>,
    pub headers: HeaderValues,
}

impl RequestSnapshot {
    pub fn from_parts(parts: &Parts, peer: Option<SocketAddr>) -> Self {
        let host = parts
            .headers
            .get(header::HOST)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .or_else(|| parts.uri.authority().map(ToString::to_string))
            .unwrap_or_default();

        let content_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        Self {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            proto: format!("{:?}", parts.version),
            host,
            remote_addr: peer.map(|addr| addr.to_string()),
            content_length,
            headers: header_values(&parts.headers),
        }
    }
}

/// Group a header map by name, keeping repeated values in arrival order.
pub fn header_values(headers: &HeaderMap) -> HeaderValues {
    let mut grouped = HeaderValues::new();
    for (name, value) in headers {
        grouped
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn repeated_headers_are_grouped() {
        let (parts, _) = Request::builder()
            .uri("/request")
            .header("Host", "ifconfig.io")
            .header("Accept", "text/html")
            .header("Accept", "*/*")
            .body(())
            .unwrap()
            .into_parts();

        let snapshot = RequestSnapshot::from_parts(&parts, Some("198.51.100.7:4000".parse().unwrap()));

        assert_eq!(snapshot.method, "GET");
        assert_eq!(snapshot.uri, "/request");
        assert_eq!(snapshot.proto, "HTTP/1.1");
        assert_eq!(snapshot.host, "ifconfig.io");
        assert_eq!(snapshot.remote_addr.as_deref(), Some("198.51.100.7:4000"));
        assert_eq!(snapshot.headers["accept"], vec!["text/html", "*/*"]);
    }
}
