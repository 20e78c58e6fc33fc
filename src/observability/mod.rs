//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, pretty or JSON)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Metrics endpoint (Prometheus scrape, when configured)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the access log and response headers
//! - Metrics are cheap when no exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::init_metrics;
