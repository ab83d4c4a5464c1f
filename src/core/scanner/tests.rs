// Orchestrator tests against in-process fake adapters.

use super::*;
use crate::core::models::{CertificateWindow, Registration, SslInfo, WhoisInfo};
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// How a fake adapter should behave.
#[derive(Clone, Copy)]
pub(crate) enum Behavior {
    Succeed,
    Fail,
    Panic,
    Hang,
}

/// One fake standing in for all three adapters, counting invocations.
pub(crate) struct FakeAdapters {
    pub dns: Behavior,
    pub tls: Behavior,
    pub registration: Behavior,
    pub calls: AtomicUsize,
    /// Lookups started and not yet finished or dropped.
    pub in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeAdapters {
    pub fn new(dns: Behavior, tls: Behavior, registration: Behavior) -> Arc<Self> {
        Arc::new(Self {
            dns,
            tls,
            registration,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        })
    }

    async fn act<T>(&self, behavior: Behavior, adapter: AdapterKind, value: T) -> LookupOutcome<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);
        match behavior {
            Behavior::Succeed => Ok(value),
            Behavior::Fail => Err(LookupError::failed(adapter, "fake failure")),
            Behavior::Panic => panic!("fake {adapter} adapter panicked"),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(value)
            }
        }
    }
}

pub(crate) fn sample_window() -> CertificateWindow {
    CertificateWindow {
        valid: true,
        valid_from: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        valid_to: Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap(),
        days_remaining: 75,
    }
}

pub(crate) fn sample_registration() -> Registration {
    Registration {
        registrar_name: "Test Registrar".into(),
        creation_date: "1995-08-14T04:00:00Z".into(),
        expiration_date: "2030-08-13T04:00:00Z".into(),
    }
}

#[async_trait]
impl AddressLookup for FakeAdapters {
    async fn resolve(&self, _domain: &CanonicalDomain) -> LookupOutcome<IpAddr> {
        let addr: IpAddr = [1, 2, 3, 4].into();
        self.act(self.dns, AdapterKind::Dns, addr).await
    }
}

#[async_trait]
impl CertificateLookup for FakeAdapters {
    async fn inspect(&self, _domain: &CanonicalDomain) -> LookupOutcome<CertificateWindow> {
        self.act(self.tls, AdapterKind::Tls, sample_window()).await
    }
}

#[async_trait]
impl RegistrationLookup for FakeAdapters {
    async fn lookup(&self, _domain: &CanonicalDomain) -> LookupOutcome<Registration> {
        self.act(self.registration, AdapterKind::Registration, sample_registration())
            .await
    }
}

pub(crate) fn scanner_with(fake: &Arc<FakeAdapters>) -> Scanner {
    Scanner::new(fake.clone(), fake.clone(), fake.clone())
}

use Behavior::*;

#[tokio::test]
async fn all_lookups_succeeding_yields_full_result() {
    let fake = FakeAdapters::new(Succeed, Succeed, Succeed);
    let result = scanner_with(&fake)
        .scan_domain("https://Example.com/path")
        .await
        .unwrap();

    assert_eq!(result.domain.as_str(), "example.com");
    assert_eq!(result.ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(result.ssl.valid, Some(true));
    assert_eq!(result.ssl.days_remaining, Some(75));
    assert!(result.ssl.valid_from.is_some() && result.ssl.valid_to.is_some());
    assert_eq!(result.whois.registrar_name.as_deref(), Some("Test Registrar"));
    assert!(result.whois.creation_date.is_some() && result.whois.expiration_date.is_some());
    assert!(result.timestamp <= Utc::now());
    assert_eq!(fake.calls.load(Ordering::SeqCst), 3);

    let json = serde_json::to_value(&result).unwrap();
    let ts = json["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
}

#[tokio::test]
async fn dns_failure_nulls_only_ip() {
    let fake = FakeAdapters::new(Fail, Succeed, Succeed);
    let result = scanner_with(&fake).scan_domain("example.com").await.unwrap();

    assert_eq!(result.ip, None);
    assert!(result.ssl.is_populated());
    assert!(result.whois.is_populated());
}

#[tokio::test]
async fn tls_failure_nulls_only_ssl() {
    let fake = FakeAdapters::new(Succeed, Fail, Succeed);
    let result = scanner_with(&fake).scan_domain("example.com").await.unwrap();

    assert!(result.ip.is_some());
    assert_eq!(result.ssl, SslInfo::default());
    assert!(result.whois.is_populated());
}

#[tokio::test]
async fn registration_failure_nulls_only_whois() {
    let fake = FakeAdapters::new(Succeed, Succeed, Fail);
    let result = scanner_with(&fake).scan_domain("example.com").await.unwrap();

    assert!(result.ip.is_some());
    assert!(result.ssl.is_populated());
    assert_eq!(result.whois, WhoisInfo::default());
}

#[tokio::test]
async fn whois_alone_is_enough() {
    let fake = FakeAdapters::new(Fail, Fail, Succeed);
    let result = scanner_with(&fake).scan_domain("example.com").await.unwrap();

    assert_eq!(result.ip, None);
    assert_eq!(result.ssl, SslInfo::default());
    assert!(result.whois.is_populated());
}

#[tokio::test]
async fn every_lookup_failing_is_scan_failed() {
    let fake = FakeAdapters::new(Fail, Fail, Fail);
    let err = scanner_with(&fake).scan_domain("example.com").await.unwrap_err();

    assert_eq!(err, ScanError::ScanFailed);
    assert_eq!(err.to_string(), "SCAN_FAILED");
    assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn panicking_adapter_does_not_take_down_the_others() {
    let fake = FakeAdapters::new(Panic, Succeed, Succeed);
    let result = scanner_with(&fake).scan_domain("example.com").await.unwrap();

    assert_eq!(result.ip, None);
    assert!(result.ssl.is_populated());
    assert!(result.whois.is_populated());
}

#[tokio::test]
async fn scan_timeout_turns_a_hung_adapter_into_a_failure() {
    let fake = FakeAdapters::new(Succeed, Hang, Succeed);
    let scanner = scanner_with(&fake).with_scan_timeout(Some(Duration::from_millis(50)));

    let result = scanner.scan_domain("example.com").await.unwrap();
    assert!(result.ip.is_some());
    assert_eq!(result.ssl, SslInfo::default());
}

#[tokio::test]
async fn bad_input_is_rejected_before_any_lookup() {
    let fake = FakeAdapters::new(Succeed, Succeed, Succeed);
    let scanner = scanner_with(&fake);

    assert_eq!(scanner.scan_domain("").await.unwrap_err(), ScanError::EmptyInput);
    assert_eq!(scanner.scan_domain("   ").await.unwrap_err(), ScanError::EmptyInput);
    assert_eq!(
        scanner.scan_domain("-example.com").await.unwrap_err(),
        ScanError::InvalidDomain
    );
    assert_eq!(
        scanner.scan_domain("not_a_domain").await.unwrap_err(),
        ScanError::InvalidDomain
    );
    assert_eq!(scanner.scan_domain("localhost").await.unwrap_err(), ScanError::InvalidDomain);
    assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn trailing_dot_is_dropped_before_dispatch() {
    let fake = FakeAdapters::new(Succeed, Succeed, Succeed);
    let result = scanner_with(&fake).scan_domain("example.com.").await.unwrap();
    assert_eq!(result.domain.as_str(), "example.com");
}

#[tokio::test]
async fn dropping_a_scan_aborts_its_pending_lookups() {
    let fake = FakeAdapters::new(Succeed, Hang, Hang);
    let scanner = scanner_with(&fake);

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        scanner.scan_domain("example.com"),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    assert_eq!(fake.in_flight.load(Ordering::SeqCst), 0);
}
