//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured listeners
//!     → listener.rs (bind plain / TLS / PROXY / activated, serve router)
//!     → tls.rs (certificate loading for the HTTPS listener)
//!     → proxy_protocol.rs (PROXY v1/v2 header before HTTP)
//!     → activation.rs (descriptors inherited from the init system)
//!     → Hand off to the shared HTTP router
//!
//! probe.rs: outbound TCP reachability check for `porttest`
//! ```
//!
//! # Design Decisions
//! - All listeners bind before any starts serving, so startup fails fast
//! - Every listener serves the same router
//! - TLS and PROXY protocol are optional and handled transparently

pub mod activation;
pub mod listener;
pub mod probe;
pub mod proxy_protocol;
pub mod tls;

pub use listener::{bind_all, BoundListener, ListenerError, ListenerKind};
pub use probe::{PortError, PortProber, PROBE_TIMEOUT};
pub use proxy_protocol::{ProxyHeader, ProxyProtocolListener};
