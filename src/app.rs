// src/app.rs

use color_eyre::eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::core::batch::run_batch;
use crate::core::models::BatchReport;
use crate::core::scanner::Scanner;
use crate::core::scanner::dns_scanner::DnsScanner;
use crate::core::scanner::rdap_scanner::RdapScanner;
use crate::core::scanner::ssl_scanner::SslScanner;
use crate::storage::{ResultStore, SqliteStore};

/// Outcome of persisting the successful records of a batch.
#[derive(Debug, Default)]
pub struct PersistSummary {
    pub stored: Vec<(String, u64)>,
    pub failed: Vec<(String, String)>,
}

/// Process-wide handles, built once at startup and passed down explicitly.
pub struct App {
    pub config: Config,
    pub scanner: Scanner,
    pub store: Arc<dyn ResultStore>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let scan = &config.scan;
        let dns = Arc::new(DnsScanner::new(scan.dns_timeout()));
        let tls = Arc::new(SslScanner::new(scan.tls_port, scan.tls_timeout()));
        let rdap = Arc::new(RdapScanner::new(&config.rdap, scan.rdap_timeout())?);
        let scanner = Scanner::new(dns, tls, rdap).with_scan_timeout(scan.scan_timeout());

        let store_path = config.storage.resolved_path();
        let store = SqliteStore::open(&store_path)
            .await
            .wrap_err_with(|| format!("Failed to open result store at {}", store_path.display()))?;

        Ok(Self::with_parts(config, scanner, Arc::new(store)))
    }

    pub fn with_parts(config: Config, scanner: Scanner, store: Arc<dyn ResultStore>) -> Self {
        Self {
            config,
            scanner,
            store,
        }
    }

    /// Runs a batch, falling back to the configured concurrency.
    pub async fn scan(&self, inputs: Vec<String>, concurrency: Option<usize>) -> BatchReport {
        let concurrency = concurrency.unwrap_or(self.config.batch.concurrency);
        run_batch(&self.scanner, inputs, concurrency).await
    }

    /// Stores every successful record. Storage failures never discard the scan output.
    pub async fn persist(&self, report: &BatchReport) -> PersistSummary {
        let mut summary = PersistSummary::default();
        for record in &report.results {
            let Some(result) = &record.result else { continue };
            match self.store.insert(result).await {
                Ok(id) => {
                    info!(id, domain = %result.domain, "Persisted scan result.");
                    summary.stored.push((result.domain.to_string(), id));
                }
                Err(e) => {
                    error!(domain = %result.domain, error = %e, "Failed to save result.");
                    summary.failed.push((result.domain.to_string(), e.to_string()));
                }
            }
        }
        summary
    }
}
