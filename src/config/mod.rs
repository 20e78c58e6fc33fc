//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (HOSTNAME, PORT, TLS, ...)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with the resolver and every listener
//! ```
//!
//! # Design Decisions
//! - Config is resolved once at startup and never mutated afterwards
//! - All fields have defaults so an empty environment still runs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{
    AppConfig, HeaderConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyProtocolConfig,
    TimeoutConfig, TlsConfig,
};
