//! Content negotiation.
//!
//! # Responsibilities
//! - Dispatch on the selector name (porttest, root, request, all, headers, field)
//! - Serialize in the requested format (plain, JSON, JS assignment, document)
//! - Map client errors to 4xx with a human-readable body
//!
//! # Design Decisions
//! - Rendering produces a complete body; nothing is streamed
//! - `Rendered` is plain data so negotiation is testable without a server

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::attributes::{is_command_line, RequestAttributes, RequestSnapshot};
use crate::http::page;
use crate::net::PortProber;
use crate::routing::{FieldSelector, Format};

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_JAVASCRIPT: &str = "application/javascript";

/// JS variable the bulk views assign to.
const JS_VARIABLE: &str = "ifconfig_io";

/// A finished response: status, content type and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Rendered {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, TEXT_PLAIN, body)
    }

    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn internal_error() -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }

    fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::new(StatusCode::OK, APPLICATION_JSON, body),
            Err(e) => {
                tracing::error!(error = %e, "JSON serialization failed");
                Self::internal_error()
            }
        }
    }

    /// `<variable> = <json>\n`
    fn js<T: Serialize + ?Sized>(variable: &str, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => Self::new(
                StatusCode::OK,
                APPLICATION_JAVASCRIPT,
                format!("{variable} = {json}\n"),
            ),
            Err(e) => {
                tracing::error!(error = %e, "JSON serialization failed");
                Self::internal_error()
            }
        }
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        response
    }
}

/// Render the response for `selector`.
pub async fn render(
    selector: &FieldSelector,
    attributes: &RequestAttributes,
    request: &RequestSnapshot,
    prober: &PortProber,
) -> Rendered {
    let format = selector.format();

    match selector.name() {
        "porttest" => match prober.probe(&attributes.ip, selector.suffix()).await {
            Ok(reachable) => {
                crate::observability::metrics::record_port_probe(reachable);
                Rendered::text(StatusCode::OK, format!("{reachable}\n"))
            }
            Err(e) => Rendered::text(StatusCode::BAD_REQUEST, e.to_string()),
        },
        "" => {
            if is_command_line(&attributes.ua) {
                Rendered::text(StatusCode::OK, format!("{}\n", attributes.ip))
            } else {
                Rendered::new(StatusCode::OK, TEXT_HTML, page::landing(attributes))
            }
        }
        "request" => Rendered::json(request),
        "all" => match format {
            Format::Json => Rendered::json(attributes),
            Format::Js => Rendered::js(JS_VARIABLE, attributes),
            Format::Plain => Rendered::text(StatusCode::OK, attributes.to_document()),
        },
        "headers" => match format {
            Format::Js => Rendered::js(JS_VARIABLE, &request.headers),
            Format::Json | Format::Plain => Rendered::json(&request.headers),
        },
        name => match attributes.get(name) {
            None => Rendered::not_found(),
            Some(value) => match format {
                Format::Json => Rendered::json(&value),
                Format::Js => Rendered::js(name, &value),
                Format::Plain => Rendered::text(StatusCode::OK, format!("{value}\n")),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn attributes(ua: &str) -> RequestAttributes {
        RequestAttributes {
            ifconfig_hostname: "ifconfig.io".into(),
            ip: "127.0.0.1".into(),
            port: 40000,
            ua: ua.into(),
            lang: "en".into(),
            encoding: "gzip".into(),
            method: "GET".into(),
            mime: "*/*".into(),
            referer: String::new(),
            forwarded: String::new(),
            country_code: "NL".into(),
            host: "localhost.".into(),
        }
    }

    fn snapshot() -> RequestSnapshot {
        let (parts, _) = Request::builder()
            .uri("/headers")
            .header("Host", "ifconfig.io")
            .header("User-Agent", "curl/8.4.0")
            .body(())
            .unwrap()
            .into_parts();
        RequestSnapshot::from_parts(&parts, Some("127.0.0.1:40000".parse().unwrap()))
    }

    async fn run(path: &str, ua: &str) -> Rendered {
        let prober = PortProber::new(Duration::from_millis(500));
        render(&FieldSelector::parse(path), &attributes(ua), &snapshot(), &prober).await
    }

    #[tokio::test]
    async fn single_field_formats() {
        let plain = run("/ip", "curl/8.4.0").await;
        assert_eq!(plain, Rendered::text(StatusCode::OK, "127.0.0.1\n"));

        let json = run("/port.json", "curl/8.4.0").await;
        assert_eq!(json.content_type, APPLICATION_JSON);
        assert_eq!(json.body, "40000");

        let json = run("/country_code.json", "curl/8.4.0").await;
        assert_eq!(json.body, "\"NL\"");

        let js = run("/ua.js", "curl/8.4.0").await;
        assert_eq!(js.content_type, APPLICATION_JAVASCRIPT);
        assert_eq!(js.body, "ua = \"curl/8.4.0\"\n");
    }

    #[tokio::test]
    async fn unknown_fields_are_not_found() {
        for path in ["/nope", "/nope.json", "/IP", "/Headers.js", "/wp-login.php"] {
            let rendered = run(path, "curl/8.4.0").await;
            assert_eq!(rendered.status, StatusCode::NOT_FOUND, "{path}");
            assert_eq!(rendered.body, "Not Found");
        }
    }

    #[tokio::test]
    async fn root_depends_on_agent() {
        let cli = run("/", "curl/7.83.1").await;
        assert_eq!(cli, Rendered::text(StatusCode::OK, "127.0.0.1\n"));

        let browser = run("/", "Mozilla/5.0 (X11) Firefox/120.0").await;
        assert_eq!(browser.content_type, TEXT_HTML);
        assert!(browser.body.contains("127.0.0.1"));
        assert!(browser.body.contains("localhost."));
    }

    #[tokio::test]
    async fn all_views_share_a_key_set() {
        let json = run("/all.json", "curl/8.4.0").await;
        let decoded: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&json.body).unwrap();
        let json_keys: BTreeSet<String> = decoded.keys().cloned().collect();

        let plain = run("/all", "curl/8.4.0").await;
        assert_eq!(plain.content_type, TEXT_PLAIN);
        let plain_keys: BTreeSet<String> = plain
            .body
            .lines()
            .map(|line| line.split_once(": ").unwrap().0.to_string())
            .collect();

        assert_eq!(json_keys, plain_keys);
        assert_eq!(json_keys.len(), RequestAttributes::KEYS.len());
    }

    #[tokio::test]
    async fn all_js_assigns_variable() {
        let js = run("/all.js", "curl/8.4.0").await;
        assert_eq!(js.content_type, APPLICATION_JAVASCRIPT);
        let json = js
            .body
            .strip_prefix("ifconfig_io = ")
            .and_then(|rest| rest.strip_suffix('\n'))
            .unwrap();
        let decoded: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(decoded["port"], 40000);
    }

    #[tokio::test]
    async fn headers_views() {
        let json = run("/headers", "curl/8.4.0").await;
        assert_eq!(json.content_type, APPLICATION_JSON);
        let decoded: serde_json::Value = serde_json::from_str(&json.body).unwrap();
        assert_eq!(decoded["user-agent"][0], "curl/8.4.0");

        let js = run("/headers.js", "curl/8.4.0").await;
        assert_eq!(js.content_type, APPLICATION_JAVASCRIPT);
        assert!(js.body.starts_with("ifconfig_io = {"));
        assert!(js.body.ends_with("}\n"));
    }

    #[tokio::test]
    async fn request_dump_is_json() {
        let rendered = run("/request", "curl/8.4.0").await;
        let decoded: serde_json::Value = serde_json::from_str(&rendered.body).unwrap();
        assert_eq!(decoded["method"], "GET");
        assert_eq!(decoded["host"], "ifconfig.io");
        assert_eq!(decoded["remote_addr"], "127.0.0.1:40000");
    }

    #[tokio::test]
    async fn porttest_validates_port() {
        let missing = run("/porttest", "curl/8.4.0").await;
        assert_eq!(missing, Rendered::text(StatusCode::BAD_REQUEST, "Need Port"));

        let invalid = run("/porttest.99999", "curl/8.4.0").await;
        assert_eq!(
            invalid,
            Rendered::text(StatusCode::BAD_REQUEST, "Invalid Port Number")
        );
    }

    #[tokio::test]
    async fn porttest_reports_reachability() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let open = run(&format!("/porttest.{port}"), "curl/8.4.0").await;
        assert_eq!(open, Rendered::text(StatusCode::OK, "true\n"));

        drop(listener);
        let closed = run(&format!("/porttest.{port}"), "curl/8.4.0").await;
        assert_eq!(closed, Rendered::text(StatusCode::OK, "false\n"));
    }

    #[test]
    fn into_response_sets_content_type() {
        let response = Rendered::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], TEXT_PLAIN);
    }
}
