// src/core/scanner/ssl_scanner.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, warn};
use x509_parser::prelude::*;

use super::CertificateLookup;
use crate::core::domain::CanonicalDomain;
use crate::core::errors::{AdapterKind, LookupError};
use crate::core::models::{CertificateWindow, LookupOutcome};

/// Socket timeouts sit above the adapter bound so the outer timeout is what fires.
const SOCKET_GRACE: Duration = Duration::from_secs(1);

/// Reads the leaf certificate from a verified TLS handshake.
pub struct SslScanner {
    port: u16,
    timeout: Duration,
    /// Fixed peer instead of resolving the domain.
    connect_to: Option<SocketAddr>,
}

impl SslScanner {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            connect_to: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn connect_to(mut self, addr: SocketAddr) -> Self {
        self.connect_to = Some(addr);
        self
    }

    fn timed_out(&self) -> LookupError {
        LookupError::Timeout {
            adapter: AdapterKind::Tls,
            seconds: self.timeout.as_secs(),
        }
    }
}

#[async_trait]
impl CertificateLookup for SslScanner {
    async fn inspect(&self, domain: &CanonicalDomain) -> LookupOutcome<CertificateWindow> {
        info!(domain = %domain, port = self.port, "Starting SSL/TLS check.");
        let target_owned = domain.as_str().to_string();
        let (port, timeout, connect_to) = (self.port, self.timeout, self.connect_to);

        debug!("Spawning blocking task for TLS connection.");
        let task =
            spawn_blocking(move || perform_tls_scan(&target_owned, port, timeout, connect_to));

        let window = tokio::time::timeout(timeout, task)
            .await
            .map_err(|_| {
                warn!(domain = %domain, "TLS check timed out.");
                self.timed_out()
            })?
            .unwrap_or_else(|e| {
                error!(panic = %e, "Blocking SSL scan task panicked!");
                Err(tls_error(format!("Task panicked: {e}")))
            })
            .map_err(|e| match e {
                LookupError::Timeout { .. } => self.timed_out(),
                other => other,
            })?;

        info!(domain = %domain, days_remaining = window.days_remaining, "SSL/TLS check finished.");
        Ok(window)
    }
}

fn tls_error(reason: String) -> LookupError {
    LookupError::failed(AdapterKind::Tls, reason)
}

/// Connects to the first reachable address, trying each in order.
fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> LookupOutcome<TcpStream> {
    let mut last_error = None;
    for addr in addrs {
        debug!(%addr, "Connecting TCP stream.");
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                warn!(%addr, error = %e, "TCP connection failed");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) if e.kind() == ErrorKind::TimedOut => LookupError::Timeout {
            adapter: AdapterKind::Tls,
            seconds: timeout.as_secs(),
        },
        Some(e) => tls_error(format!("TCP Connection Error: {e}")),
        None => tls_error("no socket address".to_string()),
    })
}

fn perform_tls_scan(
    target: &str,
    port: u16,
    timeout: Duration,
    connect_to: Option<SocketAddr>,
) -> LookupOutcome<CertificateWindow> {
    debug!(target, "Performing TLS connection and handshake.");

    let connector = TlsConnector::new().map_err(|e| {
        error!(error = %e, "Failed to create TlsConnector");
        tls_error(format!("TlsConnector Error: {e}"))
    })?;

    let addrs: Vec<SocketAddr> = match connect_to {
        Some(addr) => vec![addr],
        None => (target, port)
            .to_socket_addrs()
            .map_err(|e| tls_error(format!("Address Error: {e}")))?
            .collect(),
    };

    let stream = connect_any(&addrs, timeout)?;
    stream
        .set_read_timeout(Some(timeout + SOCKET_GRACE))
        .and_then(|_| stream.set_write_timeout(Some(timeout + SOCKET_GRACE)))
        .map_err(|e| tls_error(format!("Socket Error: {e}")))?;

    debug!(target, "Performing TLS handshake.");
    let stream = connector.connect(target, stream).map_err(|e| {
        warn!(error = %e, "TLS handshake failed");
        tls_error(format!("TLS Handshake Error: {e}"))
    })?;

    let cert = stream
        .peer_certificate()
        .map_err(|e| tls_error(format!("Could not get peer certificate: {e}")))?
        .ok_or_else(|| tls_error("server did not present a certificate".to_string()))?;

    let cert_der = cert.to_der().map_err(|e| {
        error!(error = %e, "Failed to convert certificate to DER format");
        tls_error(format!("Could not convert certificate to DER: {e}"))
    })?;

    let (_, x509) = parse_x509_certificate(&cert_der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        tls_error(format!("X.509 Parse Error: {e}"))
    })?;

    debug!(subject = %x509.subject(), issuer = %x509.issuer(), "Parsed certificate.");

    let validity = x509.validity();
    Ok(certificate_window(
        asn1_time_to_chrono_utc(&validity.not_before),
        asn1_time_to_chrono_utc(&validity.not_after),
        Utc::now(),
    ))
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

/// Derives validity and whole days left at `now`.
pub(crate) fn certificate_window(
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CertificateWindow {
    CertificateWindow {
        valid: now >= not_before && now <= not_after,
        valid_from: not_before,
        valid_to: not_after,
        days_remaining: not_after.signed_duration_since(now).num_days(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::net::TcpListener;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_inside_validity_counts_whole_days() {
        let w = certificate_window(at(2026, 1, 1), at(2026, 12, 31), at(2026, 12, 1));
        assert!(w.valid);
        assert_eq!(w.days_remaining, 30);
    }

    #[test]
    fn expired_certificate_is_invalid_with_negative_days() {
        let w = certificate_window(at(2024, 1, 1), at(2025, 1, 1), at(2025, 1, 11));
        assert!(!w.valid);
        assert_eq!(w.days_remaining, -10);
    }

    #[test]
    fn connect_skips_unreachable_addresses() {
        let closed = TcpListener::bind("127.0.0.1:0").unwrap();
        let closed_addr = closed.local_addr().unwrap();
        drop(closed);
        let open = TcpListener::bind("127.0.0.1:0").unwrap();
        let open_addr = open.local_addr().unwrap();

        let stream = connect_any(&[closed_addr, open_addr], Duration::from_secs(2)).unwrap();
        assert_eq!(stream.peer_addr().unwrap(), open_addr);

        let err = connect_any(&[closed_addr], Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, LookupError::Failed { adapter: AdapterKind::Tls, .. }));
        assert!(connect_any(&[], Duration::from_secs(2)).is_err());
    }

    #[tokio::test]
    async fn stalled_handshake_times_out() {
        // Accepts the TCP connection via the backlog but never answers the ClientHello.
        let silent = TcpListener::bind("127.0.0.1:0").unwrap();
        let scanner = SslScanner::new(443, Duration::from_millis(200))
            .connect_to(silent.local_addr().unwrap());

        let domain = CanonicalDomain::parse("example.com").unwrap();
        let err = scanner.inspect(&domain).await.unwrap_err();
        assert!(matches!(err, LookupError::Timeout { adapter: AdapterKind::Tls, .. }));
    }

    #[test]
    fn not_yet_valid_certificate_is_invalid() {
        let w = certificate_window(at(2027, 1, 1), at(2028, 1, 1), at(2026, 6, 1));
        assert!(!w.valid);
        assert!(w.days_remaining > 365);
    }
}
