// src/core/scanner/mod.rs

// Public interface of the `scanner` module: the adapter seams, the
// concrete adapters, and the orchestrator that fans out to them.
pub mod dns_scanner;
pub mod rdap_scanner;
pub mod ssl_scanner;

#[cfg(test)]
pub(crate) mod tests;

use async_trait::async_trait;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::core::domain::CanonicalDomain;
use crate::core::errors::{AdapterKind, LookupError, ScanError};
use crate::core::models::{CertificateWindow, LookupOutcome, Registration, ScanResult};

/// Resolves a domain to its primary address.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn resolve(&self, domain: &CanonicalDomain) -> LookupOutcome<IpAddr>;
}

/// Inspects the certificate served on the domain's TLS port.
#[async_trait]
pub trait CertificateLookup: Send + Sync {
    async fn inspect(&self, domain: &CanonicalDomain) -> LookupOutcome<CertificateWindow>;
}

/// Fetches registrar and lifecycle dates from a registry.
#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    async fn lookup(&self, domain: &CanonicalDomain) -> LookupOutcome<Registration>;
}

/// Runs the three lookups for a domain and merges them under the partial-failure policy.
#[derive(Clone)]
pub struct Scanner {
    dns: Arc<dyn AddressLookup>,
    tls: Arc<dyn CertificateLookup>,
    registration: Arc<dyn RegistrationLookup>,
    scan_timeout: Option<Duration>,
}

impl Scanner {
    pub fn new(
        dns: Arc<dyn AddressLookup>,
        tls: Arc<dyn CertificateLookup>,
        registration: Arc<dyn RegistrationLookup>,
    ) -> Self {
        Self {
            dns,
            tls,
            registration,
            scan_timeout: None,
        }
    }

    /// Bounds every adapter of a scan by `timeout` on top of its own limit.
    pub fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Normalizes `raw`, runs all lookups concurrently, and assembles the result.
    ///
    /// Fails with `EmptyInput`/`InvalidDomain` before any lookup is attempted,
    /// and with `ScanFailed` only when every lookup failed.
    pub async fn scan_domain(&self, raw: &str) -> Result<ScanResult, ScanError> {
        let domain = CanonicalDomain::parse(raw).inspect_err(|e| {
            debug!(input = raw, code = e.code(), "Rejected scan input.");
        })?;

        info!(domain = %domain, "Starting domain scan.");

        let dns = {
            let adapter = Arc::clone(&self.dns);
            let domain = domain.clone();
            self.supervise(AdapterKind::Dns, async move { adapter.resolve(&domain).await })
        };
        let tls = {
            let adapter = Arc::clone(&self.tls);
            let domain = domain.clone();
            self.supervise(AdapterKind::Tls, async move { adapter.inspect(&domain).await })
        };
        let registration = {
            let adapter = Arc::clone(&self.registration);
            let domain = domain.clone();
            self.supervise(AdapterKind::Registration, async move {
                adapter.lookup(&domain).await
            })
        };

        // Results are merged only after all three have settled.
        let (ip, certificate, registration) = tokio::join!(dns, tls, registration);

        let ip = settle(&domain, ip);
        let certificate = settle(&domain, certificate);
        let registration = settle(&domain, registration);

        if ip.is_none() && certificate.is_none() && registration.is_none() {
            warn!(domain = %domain, "All lookups failed.");
            return Err(ScanError::ScanFailed);
        }

        let result = ScanResult::assemble(domain, ip, certificate, registration);
        info!(
            domain = %result.domain,
            ip = result.ip.is_some(),
            ssl = result.ssl.is_populated(),
            whois = result.whois.is_populated(),
            "Domain scan finished."
        );
        Ok(result)
    }

    /// Runs one adapter in its own task so a panic or failure stays local.
    async fn supervise<T, F>(&self, adapter: AdapterKind, lookup: F) -> LookupOutcome<T>
    where
        T: Send + 'static,
        F: Future<Output = LookupOutcome<T>> + Send + 'static,
    {
        let scan_timeout = self.scan_timeout;
        let handle = tokio::spawn(async move {
            match scan_timeout {
                Some(limit) => tokio::time::timeout(limit, lookup).await.unwrap_or_else(|_| {
                    Err(LookupError::Timeout {
                        adapter,
                        seconds: limit.as_secs(),
                    })
                }),
                None => lookup.await,
            }
        });

        // Aborts the lookup when the scan is dropped before it settles.
        let _abort = AbortOnDrop(handle.abort_handle());
        handle
            .await
            .unwrap_or_else(|e| Err(LookupError::failed(adapter, format!("task aborted: {e}"))))
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn settle<T>(domain: &CanonicalDomain, outcome: LookupOutcome<T>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(domain = %domain, adapter = %e.adapter(), error = %e, "Lookup failed.");
            None
        }
    }
}
