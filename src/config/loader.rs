//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{key}={value:?} is invalid: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => AppConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML configuration file without validating it.
pub fn load_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto `config`.
///
/// Unset and empty variables leave the existing value alone.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(value) = var("HOSTNAME") {
        config.hostname = value;
    }
    if let Some(value) = var("HOST") {
        config.listener.host = value;
    }
    if let Some(value) = var("PORT") {
        config.listener.port = parse_env("PORT", value)?;
    }
    if let Some(value) = var("TLSPORT") {
        config.tls.port = parse_env("TLSPORT", value)?;
    }
    if let Some(value) = var("TLS") {
        config.tls.enabled = is_truthy(&value);
    }
    if let Some(value) = var("TLSCERT") {
        config.tls.cert_path = value;
    }
    if let Some(value) = var("TLSKEY") {
        config.tls.key_path = value;
    }
    if let Some(value) = var("PROXY_PROTOCOL_ADDR") {
        config.proxy_protocol.address = Some(value);
    }
    if let Some(value) = var("FORWARD_IP_HEADER") {
        config.headers.forward_ip = value;
    }
    if let Some(value) = var("COUNTRY_CODE_HEADER") {
        config.headers.country_code = value;
    }
    if let Some(value) = var("REQUEST_TIMEOUT_SECS") {
        config.timeouts.request_secs = parse_env("REQUEST_TIMEOUT_SECS", value)?;
    }
    if let Some(value) = var("DNS_TIMEOUT_MS") {
        config.timeouts.dns_ms = parse_env("DNS_TIMEOUT_MS", value)?;
    }
    if let Some(value) = var("METRICS_ADDR") {
        config.observability.metrics_address = Some(value);
    }
    if let Some(value) = var("LOG_FORMAT") {
        config.observability.log_format = match value.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: "LOG_FORMAT",
                    value,
                    reason: "expected `json` or `pretty`".to_string(),
                })
            }
        };
    }

    Ok(())
}

fn parse_env<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        key,
        reason: e.to_string(),
        value,
    })
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
