//! Builds the attribute record for a single request.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::http::{header, HeaderMap, Method};
use thiserror::Error;

use crate::attributes::agent::is_command_line;
use crate::attributes::lookup::HostnameLookup;
use crate::attributes::record::RequestAttributes;
use crate::config::AppConfig;

/// Why a request's attributes could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("remote address unavailable")]
    MissingRemoteAddr,
}

/// Resolves request attributes from connection info and headers.
///
/// The client IP comes from the transport unless the configured trusted
/// header carries a parseable IP in its first comma-separated entry. Only
/// that single entry is consulted; forwarding chains are not validated.
pub struct AttributeResolver {
    config: Arc<AppConfig>,
    lookup: Arc<dyn HostnameLookup>,
}

impl AttributeResolver {
    pub fn new(config: Arc<AppConfig>, lookup: Arc<dyn HostnameLookup>) -> Self {
        Self { config, lookup }
    }

    /// The client's address: trusted header IP (if valid) with the transport port.
    pub fn client_addr(
        &self,
        peer: Option<SocketAddr>,
        headers: &HeaderMap,
    ) -> Result<SocketAddr, ResolveError> {
        let mut addr = peer.ok_or(ResolveError::MissingRemoteAddr)?;
        if let Some(ip) = trusted_ip(headers, &self.config.headers.forward_ip) {
            addr.set_ip(ip);
        }
        Ok(addr)
    }

    /// Resolve every attribute for a request targeting `requested`.
    ///
    /// Reverse DNS only runs for the `host` field, or for the root page when
    /// the caller is a browser.
    pub async fn resolve(
        &self,
        peer: Option<SocketAddr>,
        method: &Method,
        headers: &HeaderMap,
        requested: &str,
    ) -> Result<RequestAttributes, ResolveError> {
        let addr = self.client_addr(peer, headers)?;
        let ip = addr.ip().to_string();
        let ua = header_text(headers, header::USER_AGENT.as_str());

        let wants_host =
            requested == "host" || (requested.is_empty() && !is_command_line(&ua));
        let host = if wants_host {
            self.lookup.reverse(addr.ip()).await
        } else {
            None
        };

        Ok(RequestAttributes {
            ifconfig_hostname: self.config.hostname.clone(),
            port: addr.port(),
            lang: header_text(headers, header::ACCEPT_LANGUAGE.as_str()),
            encoding: header_text(headers, header::ACCEPT_ENCODING.as_str()),
            method: method.to_string(),
            mime: header_text(headers, header::ACCEPT.as_str()),
            referer: header_text(headers, header::REFERER.as_str()),
            forwarded: header_text(headers, "x-forwarded-for"),
            country_code: header_text(headers, &self.config.headers.country_code),
            host: host.unwrap_or_else(|| ip.clone()),
            ip,
            ua,
        })
    }
}

/// First entry of the trusted header, if it is an IP literal.
fn trusted_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    first.parse().ok()
}

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default()
}
