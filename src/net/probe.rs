//! TCP reachability probe for the `porttest` diagnostic.
//!
//! # Design Decisions
//! - One connection attempt, no retries
//! - Refusal, unreachability and timeout all report `false`; the answer is
//!   advisory since firewalls can lie in either direction

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;

/// Fixed deadline for a single probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Rejected port argument. Display strings are the response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("Need Port")]
    Missing,
    #[error("Invalid Port Number")]
    Invalid,
}

/// Parse a port argument; it must be an integer in `1..=65535`.
pub fn parse_port(raw: Option<&str>) -> Result<u16, PortError> {
    let raw = raw.ok_or(PortError::Missing)?;
    let port: i64 = raw.parse().map_err(|_| PortError::Invalid)?;
    match u16::try_from(port) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(PortError::Invalid),
    }
}

/// Checks whether a TCP port accepts connections.
#[derive(Debug, Clone, Copy)]
pub struct PortProber {
    timeout: Duration,
}

impl PortProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Validate `port` and, when valid, probe `ip:port`.
    pub async fn probe(&self, ip: &str, port: Option<&str>) -> Result<bool, PortError> {
        let port = parse_port(port)?;
        Ok(self.is_reachable(ip, port).await)
    }

    /// Attempt one connection to `ip:port` within the probe timeout.
    pub async fn is_reachable(&self, ip: &str, port: u16) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect((ip, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(ip = %ip, port, error = %e, "Port probe refused");
                false
            }
            Err(_) => {
                tracing::debug!(ip = %ip, port, "Port probe timed out");
                false
            }
        }
    }
}

impl Default for PortProber {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}
