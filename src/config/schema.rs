//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits so a TOML file can seed them; environment
//! variables are layered on top by the loader.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Label reported as `ifconfig_hostname` on every response.
    pub hostname: String,

    /// Plain HTTP listener.
    pub listener: ListenerConfig,

    /// TLS-terminated listener.
    pub tls: TlsConfig,

    /// PROXY-protocol wrapped listener.
    pub proxy_protocol: ProxyProtocolConfig,

    /// Names of the request headers the resolver trusts.
    pub headers: HeaderConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hostname: "ifconfig.io".to_string(),
            listener: ListenerConfig::default(),
            tls: TlsConfig::default(),
            proxy_protocol: ProxyProtocolConfig::default(),
            headers: HeaderConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Plain listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind; empty means every interface.
    pub host: String,

    /// Plain HTTP port.
    pub port: u16,
}

impl ListenerConfig {
    /// Host to hand to the socket layer.
    pub fn bind_host(&self) -> &str {
        if self.host.is_empty() {
            "0.0.0.0"
        } else {
            &self.host
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 8080,
        }
    }
}

/// TLS listener configuration. Shares the bind host with [`ListenerConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,

    pub port: u16,

    /// Path to certificate chain (PEM).
    pub cert_path: String,

    /// Path to private key (PEM).
    pub key_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8443,
            cert_path: String::new(),
            key_path: String::new(),
        }
    }
}

/// PROXY-protocol listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyProtocolConfig {
    /// Socket address to listen on; the listener is disabled when unset.
    pub address: Option<String>,

    /// Deadline for a peer to deliver its PROXY header.
    pub header_timeout_secs: u64,
}

impl ProxyProtocolConfig {
    pub fn header_timeout(&self) -> Duration {
        Duration::from_secs(self.header_timeout_secs)
    }
}

impl Default for ProxyProtocolConfig {
    fn default() -> Self {
        Self {
            address: None,
            header_timeout_secs: 5,
        }
    }
}

/// Header names consulted while resolving request attributes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Header whose first entry replaces the transport address.
    pub forward_ip: String,

    /// Header carrying the upstream geolocation country code.
    pub country_code: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            forward_ip: "CF-Connecting-IP".to_string(),
            country_code: "CF-IPCountry".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline enforced by the router.
    pub request_secs: u64,

    /// Reverse DNS lookup deadline in milliseconds.
    pub dns_ms: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn dns(&self) -> Duration {
        Duration::from_millis(self.dns_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 10,
            dns_ms: 2_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,

    /// Prometheus exporter address; metrics are not exported when unset.
    pub metrics_address: Option<String>,
}
