//! ifconfig-rs: report what the network sees of the caller.
//!
//! # Architecture Overview
//!
//! ```text
//!   plain / TLS / PROXY / activated listeners (net)
//!         │
//!         ▼
//!   axum router + middleware (http::server)
//!         │
//!         ├─▶ attributes: client IP, headers, reverse DNS
//!         ├─▶ routing: `<name>[.<suffix>]` selector
//!         ▼
//!   negotiator (http::response): field / all / headers / request / porttest
//!
//!   Cross-cutting: config, observability, lifecycle (supervisor, signals)
//! ```

// Core subsystems
pub mod attributes;
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Supervisor;
