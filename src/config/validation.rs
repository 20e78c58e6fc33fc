//! Configuration validation.
//!
//! Serde handles syntax; this module checks the semantic rules and reports
//! every violation at once instead of stopping at the first.

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be a non-zero port")]
    ZeroPort { field: &'static str },

    #[error("plain and TLS listeners both use port {port}")]
    PortConflict { port: u16 },

    #[error("TLS is enabled but {field} is empty")]
    MissingTlsMaterial { field: &'static str },

    #[error("{field} `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} `{value}` is not a valid header name")]
    InvalidHeaderName { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort { field: "listener.port" });
    }

    if config.tls.enabled {
        if config.tls.port == 0 {
            errors.push(ValidationError::ZeroPort { field: "tls.port" });
        } else if config.tls.port == config.listener.port {
            errors.push(ValidationError::PortConflict {
                port: config.tls.port,
            });
        }
        if config.tls.cert_path.is_empty() {
            errors.push(ValidationError::MissingTlsMaterial {
                field: "tls.cert_path",
            });
        }
        if config.tls.key_path.is_empty() {
            errors.push(ValidationError::MissingTlsMaterial {
                field: "tls.key_path",
            });
        }
    }

    if let Some(address) = &config.proxy_protocol.address {
        if address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "proxy_protocol.address",
                value: address.clone(),
            });
        }
        if config.proxy_protocol.header_timeout_secs == 0 {
            errors.push(ValidationError::ZeroTimeout {
                field: "proxy_protocol.header_timeout_secs",
            });
        }
    }

    if let Some(address) = &config.observability.metrics_address {
        if address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "observability.metrics_address",
                value: address.clone(),
            });
        }
    }

    for (field, value) in [
        ("headers.forward_ip", &config.headers.forward_ip),
        ("headers.country_code", &config.headers.country_code),
    ] {
        if HeaderName::from_bytes(value.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName {
                field,
                value: value.clone(),
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.request_secs",
        });
    }
    if config.timeouts.dns_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.dns_ms",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
