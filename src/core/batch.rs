//! Bounded-concurrency scanning of many inputs.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::models::{BatchRecord, BatchReport, BatchSummary};
use crate::core::scanner::Scanner;

/// Scans every input with at most `concurrency` orchestrations in flight.
///
/// Output order matches `inputs`; a failing input becomes an error record
/// and never aborts the batch.
pub async fn run_batch(
    scanner: &Scanner,
    inputs: Vec<String>,
    concurrency: usize,
) -> BatchReport {
    let total = inputs.len();
    let workers = concurrency.max(1).min(total);
    info!(total, workers, "Starting batch scan.");

    let originals = inputs.clone();
    let queue = Arc::new(Mutex::new(inputs.into_iter().enumerate()));
    let (tx, mut rx) = mpsc::channel::<(usize, BatchRecord)>(workers.max(1));

    // Workers are aborted if this future is dropped before the batch completes.
    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        let scanner = scanner.clone();
        pool.spawn(async move {
            loop {
                let next = queue.lock().await.next();
                let Some((index, raw)) = next else { break };
                debug!(worker, index, input = %raw, "Worker picked up input.");
                let record = scan_one(&scanner, raw).await;
                if tx.send((index, record)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let mut slots: Vec<Option<BatchRecord>> = vec![None; total];
    while let Some((index, record)) = rx.recv().await {
        slots[index] = Some(record);
    }
    while pool.join_next().await.is_some() {}

    let results: Vec<BatchRecord> = slots
        .into_iter()
        .zip(originals)
        .map(|(slot, raw)| {
            slot.unwrap_or_else(|| {
                warn!(input = %raw, "Batch worker exited before finishing input.");
                BatchRecord {
                    domain: raw,
                    result: None,
                    error: Some("scan aborted".to_string()),
                    error_code: None,
                    timestamp: Utc::now(),
                }
            })
        })
        .collect();

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let summary = BatchSummary {
        total,
        succeeded,
        failed: total - succeeded,
    };
    info!(total, succeeded, failed = summary.failed, "Batch scan finished.");

    BatchReport { results, summary }
}

async fn scan_one(scanner: &Scanner, raw: String) -> BatchRecord {
    match scanner.scan_domain(&raw).await {
        Ok(result) => BatchRecord {
            domain: raw,
            result: Some(result),
            error: None,
            error_code: None,
            timestamp: Utc::now(),
        },
        Err(e) => BatchRecord {
            domain: raw,
            result: None,
            error: Some(e.to_string()),
            error_code: Some(e.code().to_string()),
            timestamp: Utc::now(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::CanonicalDomain;
    use crate::core::errors::{AdapterKind, LookupError};
    use crate::core::models::{CertificateWindow, LookupOutcome, Registration};
    use crate::core::scanner::tests::{
        Behavior, FakeAdapters, sample_registration, sample_window, scanner_with,
    };
    use crate::core::scanner::{AddressLookup, CertificateLookup, RegistrationLookup};
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Adapters that fail for domains starting with `down.` and track peak concurrency.
    #[derive(Default)]
    struct Gauge {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        async fn visit<T>(
            &self,
            domain: &CanonicalDomain,
            adapter: AdapterKind,
            value: T,
        ) -> LookupOutcome<T> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if domain.as_str().starts_with("down.") {
                Err(LookupError::failed(adapter, "unreachable"))
            } else {
                Ok(value)
            }
        }
    }

    #[async_trait]
    impl AddressLookup for Gauge {
        async fn resolve(&self, domain: &CanonicalDomain) -> LookupOutcome<IpAddr> {
            self.visit(domain, AdapterKind::Dns, [10, 0, 0, 1].into()).await
        }
    }

    #[async_trait]
    impl CertificateLookup for Gauge {
        async fn inspect(&self, domain: &CanonicalDomain) -> LookupOutcome<CertificateWindow> {
            self.visit(domain, AdapterKind::Tls, sample_window()).await
        }
    }

    #[async_trait]
    impl RegistrationLookup for Gauge {
        async fn lookup(&self, domain: &CanonicalDomain) -> LookupOutcome<Registration> {
            self.visit(domain, AdapterKind::Registration, sample_registration()).await
        }
    }

    fn scanner(gauge: &Arc<Gauge>) -> Scanner {
        Scanner::new(gauge.clone(), gauge.clone(), gauge.clone())
    }

    fn inputs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn preserves_order_and_counts_failures() {
        let gauge = Arc::new(Gauge::default());
        let report = run_batch(
            &scanner(&gauge),
            inputs(&["a.com", "-bad.com", "b.org", "down.example.net", "c.io"]),
            2,
        )
        .await;

        let domains: Vec<&str> = report.results.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(domains, ["a.com", "-bad.com", "b.org", "down.example.net", "c.io"]);

        let errors: Vec<Option<&str>> = report.results.iter().map(|r| r.error.as_deref()).collect();
        assert_eq!(
            errors,
            [None, Some("Invalid domain format"), None, Some("SCAN_FAILED"), None]
        );
        assert_eq!(report.results[3].error_code.as_deref(), Some("SCAN_FAILED"));
        assert_eq!(
            report.summary,
            BatchSummary {
                total: 5,
                succeeded: 3,
                failed: 2
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_the_concurrency_bound() {
        let gauge = Arc::new(Gauge::default());
        let names: Vec<String> = (0..8).map(|i| format!("host{i}.example.com")).collect();
        let report = run_batch(&scanner(&gauge), names, 2).await;

        assert_eq!(report.summary.succeeded, 8);
        // Each orchestration runs three adapters at once.
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2 * 3);
        assert!(gauge.peak.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn zero_concurrency_is_treated_as_one() {
        let gauge = Arc::new(Gauge::default());
        let report = run_batch(&scanner(&gauge), inputs(&["a.com", "b.com"]), 0).await;

        assert_eq!(report.summary.succeeded, 2);
        assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn dropping_a_batch_aborts_its_workers() {
        let fake = FakeAdapters::new(Behavior::Hang, Behavior::Hang, Behavior::Hang);
        let scanner = scanner_with(&fake);
        let names: Vec<String> = (0..6).map(|i| format!("host{i}.example.com")).collect();

        let outcome =
            tokio::time::timeout(Duration::from_millis(50), run_batch(&scanner, names, 2)).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        // Only the first two inputs were ever picked up.
        assert_eq!(fake.calls.load(Ordering::SeqCst), 6);
        assert_eq!(fake.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let gauge = Arc::new(Gauge::default());
        let report = run_batch(&scanner(&gauge), Vec::new(), 4).await;

        assert!(report.results.is_empty());
        assert_eq!(report.summary, BatchSummary::default());
    }
}
