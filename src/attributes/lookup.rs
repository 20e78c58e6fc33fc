//! Reverse DNS lookups.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

/// Resolves an address to a hostname, best effort.
#[async_trait]
pub trait HostnameLookup: Send + Sync {
    /// The first PTR name for `ip`, or `None` when nothing is found in time.
    async fn reverse(&self, ip: IpAddr) -> Option<String>;
}

/// Reverse lookups against the system's configured nameservers.
///
/// Every lookup is a single attempt bounded by `timeout`.
pub struct DnsLookup {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsLookup {
    pub fn from_system(timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(system) => system,
            Err(e) => {
                tracing::warn!(error = %e, "System resolver config unavailable, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }
}

#[async_trait]
impl HostnameLookup for DnsLookup {
    async fn reverse(&self, ip: IpAddr) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.resolver.reverse_lookup(ip)).await {
            Ok(Ok(names)) => names.iter().next().map(|name| name.to_string()),
            Ok(Err(e)) => {
                tracing::debug!(ip = %ip, error = %e, "Reverse lookup failed");
                None
            }
            Err(_) => {
                tracing::debug!(ip = %ip, timeout = ?self.timeout, "Reverse lookup timed out");
                None
            }
        }
    }
}
