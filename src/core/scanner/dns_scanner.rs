// src/core/scanner/dns_scanner.rs

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::AddressLookup;
use crate::core::domain::CanonicalDomain;
use crate::core::errors::{AdapterKind, LookupError};
use crate::core::models::LookupOutcome;

const RESOLVER_GRACE: Duration = Duration::from_secs(1);

/// Resolves A/AAAA records through hickory's tokio resolver.
pub struct DnsScanner {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsScanner {
    /// Uses the default upstream resolvers.
    pub fn new(timeout: Duration) -> Self {
        Self::with_config(ResolverConfig::default(), timeout)
    }

    pub fn with_config(config: ResolverConfig, timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        // The outer bound in `resolve` fires first; this only reclaims the query.
        opts.timeout = timeout + RESOLVER_GRACE;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }

    fn timed_out(&self) -> LookupError {
        LookupError::Timeout {
            adapter: AdapterKind::Dns,
            seconds: self.timeout.as_secs(),
        }
    }

    fn resolve_error(&self, e: &ResolveError) -> LookupError {
        match e.kind() {
            ResolveErrorKind::Timeout => self.timed_out(),
            ResolveErrorKind::NoRecordsFound { .. } => no_address(),
            _ => LookupError::failed(AdapterKind::Dns, format!("DNS Error: {e}")),
        }
    }
}

fn no_address() -> LookupError {
    LookupError::failed(AdapterKind::Dns, "no address records")
}

/// First address of the answer, in resolver order (IPv4 before IPv6).
fn first_address(addrs: impl IntoIterator<Item = IpAddr>) -> LookupOutcome<IpAddr> {
    addrs.into_iter().next().ok_or_else(no_address)
}

#[async_trait]
impl AddressLookup for DnsScanner {
    async fn resolve(&self, domain: &CanonicalDomain) -> LookupOutcome<IpAddr> {
        debug!(domain = %domain, "Looking up IP address.");

        let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup_ip(domain.as_str()))
            .await
            .map_err(|_| {
                warn!(domain = %domain, "DNS lookup timed out.");
                self.timed_out()
            })?
            .map_err(|e| {
                warn!(domain = %domain, error = %e, "DNS lookup failed.");
                self.resolve_error(&e)
            })?;

        let addr = first_address(lookup.iter())?;
        info!(domain = %domain, %addr, "Resolved address.");
        Ok(addr)
    }
}
