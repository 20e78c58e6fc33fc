//! Request attribute resolution.
//!
//! # Data Flow
//! ```text
//! ConnectInfo + headers + method
//!     → resolver.rs (trusted-header IP override, header copies)
//!     → agent.rs (command-line or browser?)
//!     → lookup.rs (reverse DNS, only when the answer is needed)
//!     → record.rs (RequestAttributes, typed and ordered)
//! ```
//!
//! `snapshot.rs` captures the raw request for the diagnostic views that
//! bypass the attribute record.

pub mod agent;
pub mod lookup;
pub mod record;
pub mod resolver;
pub mod snapshot;

pub use agent::is_command_line;
pub use lookup::{DnsLookup, HostnameLookup};
pub use record::{AttributeValue, RequestAttributes};
pub use resolver::{AttributeResolver, ResolveError};
pub use snapshot::{header_values, HeaderValues, RequestSnapshot};
