//! Listener binding and serving.
//!
//! # Responsibilities
//! - Bind every configured listener up front (plain, TLS, PROXY, activated)
//! - Serve the shared router on each one
//! - Report terminal listener faults as [`ListenerError`]

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::net::activation;
use crate::net::proxy_protocol::ProxyProtocolListener;
use crate::net::tls::load_tls_config;

/// Error type for listener operations. Every variant is fatal to the process.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to load TLS material: {0}")]
    Tls(std::io::Error),

    #[error("failed to accept: {0}")]
    Accept(std::io::Error),

    #[error("server failed: {0}")]
    Serve(std::io::Error),

    #[error("listener stopped unexpectedly")]
    Stopped,
}

/// Which front door a listener is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Plain,
    Tls,
    ProxyProtocol,
    Activated,
}

impl ListenerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerKind::Plain => "plain",
            ListenerKind::Tls => "tls",
            ListenerKind::ProxyProtocol => "proxy_protocol",
            ListenerKind::Activated => "activated",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Socket {
    Tcp(TcpListener),
    Tls(std::net::TcpListener, RustlsConfig),
    Proxy(ProxyProtocolListener),
}

/// A bound listener, ready to serve.
pub struct BoundListener {
    kind: ListenerKind,
    local_addr: SocketAddr,
    socket: Socket,
}

impl BoundListener {
    /// Bind a plain HTTP listener.
    pub async fn plain(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ListenerError::Bind {
                addr: format!("{host}:{port}"),
                source,
            })?;
        Self::from_tokio(ListenerKind::Plain, listener)
    }

    /// Bind a TLS listener with already loaded material.
    pub fn tls(host: &str, port: u16, config: RustlsConfig) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            addr: format!("{host}:{port}"),
            source,
        };
        let listener = std::net::TcpListener::bind((host, port)).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        Ok(Self {
            kind: ListenerKind::Tls,
            local_addr,
            socket: Socket::Tls(listener, config),
        })
    }

    /// Wrap a PROXY-protocol listener.
    pub fn proxy_protocol(listener: ProxyProtocolListener) -> Result<Self, ListenerError> {
        let local_addr = listener.local_addr().map_err(ListenerError::Accept)?;
        Ok(Self {
            kind: ListenerKind::ProxyProtocol,
            local_addr,
            socket: Socket::Proxy(listener),
        })
    }

    /// Adopt an inherited, non-blocking listener.
    pub fn activated(listener: std::net::TcpListener) -> Result<Self, ListenerError> {
        let listener = TcpListener::from_std(listener).map_err(ListenerError::Accept)?;
        Self::from_tokio(ListenerKind::Activated, listener)
    }

    fn from_tokio(kind: ListenerKind, listener: TcpListener) -> Result<Self, ListenerError> {
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            addr: kind.to_string(),
            source,
        })?;
        Ok(Self {
            kind,
            local_addr,
            socket: Socket::Tcp(listener),
        })
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve `router` until the listener fails.
    ///
    /// A listener never finishes successfully; a clean return is reported as
    /// [`ListenerError::Stopped`].
    pub async fn serve(self, router: Router) -> Result<(), ListenerError> {
        tracing::info!(kind = %self.kind, address = %self.local_addr, "Listener serving");

        match self.socket {
            Socket::Tcp(listener) => {
                axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                    .map_err(ListenerError::Serve)?;
            }
            Socket::Tls(listener, config) => {
                axum_server::from_tcp_rustls(listener, config)
                    .serve(router.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                    .map_err(ListenerError::Serve)?;
            }
            Socket::Proxy(listener) => listener.serve(router).await?,
        }

        Err(ListenerError::Stopped)
    }
}

/// Bind every listener the configuration asks for.
///
/// The plain listener always exists; TLS and PROXY are optional, and any
/// socket-activated descriptors are adopted as extra plain listeners.
pub async fn bind_all(config: &AppConfig) -> Result<Vec<BoundListener>, ListenerError> {
    let host = config.listener.bind_host();
    let mut listeners = vec![BoundListener::plain(host, config.listener.port).await?];

    if config.tls.enabled {
        let tls = load_tls_config(
            Path::new(&config.tls.cert_path),
            Path::new(&config.tls.key_path),
        )
        .await?;
        listeners.push(BoundListener::tls(host, config.tls.port, tls)?);
    }

    if let Some(address) = &config.proxy_protocol.address {
        let addr: SocketAddr = address.parse().map_err(|e| ListenerError::Bind {
            addr: address.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;
        let listener =
            ProxyProtocolListener::bind(addr, config.proxy_protocol.header_timeout()).await?;
        listeners.push(BoundListener::proxy_protocol(listener)?);
    }

    for listener in activation::listeners_from_env() {
        listeners.push(BoundListener::activated(listener)?);
    }

    for listener in &listeners {
        tracing::info!(
            kind = %listener.kind(),
            address = %listener.local_addr(),
            "Listener bound"
        );
    }

    Ok(listeners)
}
