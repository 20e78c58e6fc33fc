//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Listener connection (plain / TLS / PROXY)
//!     → server.rs (Axum setup, middleware, lookup handler)
//!     → request.rs (request ID, access log)
//!     → [attributes resolve the caller]
//!     → response.rs (negotiate view and format)
//!     → page.rs (HTML landing page for browsers)
//!     → Send to client
//! ```

pub mod page;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{render, Rendered};
pub use server::{build_router, AppState, HttpServer};
