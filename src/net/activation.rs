//! Socket activation (systemd `LISTEN_FDS` protocol).
//!
//! # Responsibilities
//! - Detect listening sockets handed over by the init system
//! - Adopt them as TCP listeners that serve the plain router
//!
//! # Design Decisions
//! - Inherited descriptors start at fd 3 and are only ours when
//!   `LISTEN_PID` is set and matches this process
//! - Problems are logged and skipped; activation is opportunistic

use std::ops::Range;

use thiserror::Error;

/// First inherited descriptor.
pub const LISTEN_FDS_START: i32 = 3;

/// Upper bound on inherited descriptors we are willing to adopt.
pub const LISTEN_FDS_MAX: i32 = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error("LISTEN_PID is not a process id: {0:?}")]
    BadPid(String),
    #[error("LISTEN_FDS is not a descriptor count: {0:?}")]
    BadCount(String),
}

/// Descriptors passed to process `pid`, given the raw environment values.
///
/// Nothing is adopted unless `LISTEN_PID` is present and names `pid`.
pub fn activated_fds(
    listen_pid: Option<&str>,
    listen_fds: Option<&str>,
    pid: u32,
) -> Result<Range<i32>, ActivationError> {
    let empty = LISTEN_FDS_START..LISTEN_FDS_START;
    let (Some(target), Some(count)) = (listen_pid, listen_fds) else {
        return Ok(empty);
    };

    let target: u32 = target
        .trim()
        .parse()
        .map_err(|_| ActivationError::BadPid(target.to_string()))?;
    if target != pid {
        return Ok(empty);
    }

    let end = count
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|count| (0..=LISTEN_FDS_MAX).contains(count))
        .and_then(|count| LISTEN_FDS_START.checked_add(count))
        .ok_or_else(|| ActivationError::BadCount(count.to_string()))?;

    Ok(LISTEN_FDS_START..end)
}

/// Adopt every socket-activated TCP listener of this process.
#[cfg(unix)]
pub fn listeners_from_env() -> Vec<std::net::TcpListener> {
    use std::os::fd::FromRawFd;

    let listen_pid = std::env::var("LISTEN_PID").ok();
    let listen_fds = std::env::var("LISTEN_FDS").ok();
    let fds = match activated_fds(listen_pid.as_deref(), listen_fds.as_deref(), std::process::id()) {
        Ok(fds) => fds,
        Err(e) => {
            tracing::warn!(error = %e, "Could not get socket-activated listeners");
            return Vec::new();
        }
    };

    let mut listeners = Vec::new();
    for fd in fds {
        // SAFETY: the init system hands these descriptors to us exclusively;
        // LISTEN_PID was checked above, and nothing else in the process owns fd >= 3
        // at startup.
        let listener = unsafe { std::net::TcpListener::from_raw_fd(fd) };
        match listener.local_addr().and_then(|_| listener.set_nonblocking(true)) {
            Ok(()) => listeners.push(listener),
            Err(e) => {
                tracing::warn!(fd, error = %e, "Inherited descriptor is not a TCP listener");
                // Hand the descriptor back untouched rather than closing it.
                std::mem::forget(listener);
            }
        }
    }
    listeners
}

#[cfg(not(unix))]
pub fn listeners_from_env() -> Vec<std::net::TcpListener> {
    Vec::new()
}
