//! Request routing.
//!
//! # Data Flow
//! ```text
//! Request path "/<name>[.<suffix>]"
//!     → selector.rs (FieldSelector: lookup key + output format)
//!     → http::response (dispatch on the key, render in the format)
//! ```
//!
//! The axum router itself only distinguishes `/` from `/{field}`; everything
//! else is decided from the parsed selector.

pub mod selector;

pub use selector::{FieldSelector, Format};
