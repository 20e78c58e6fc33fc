//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Bind all listeners
//!
//! Supervision (supervisor.rs):
//!     One task per listener → first failure stops the process
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel every listener, exit cleanly
//! ```
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind aborts startup
//! - A listener that stops later aborts the whole process with a non-zero exit

pub mod signals;
pub mod supervisor;

pub use supervisor::{Supervisor, SupervisorError};
