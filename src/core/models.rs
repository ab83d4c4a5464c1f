// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::core::domain::CanonicalDomain;
use crate::core::errors::LookupError;

// --- Reusable Result Types ---

/// Outcome of one adapter invocation. Failures are absorbed by the orchestrator.
pub type LookupOutcome<T> = Result<T, LookupError>;

// --- Adapter Payloads ---

/// Validity window of the leaf certificate presented on the TLS port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateWindow {
    pub valid: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub days_remaining: i64,
}

/// Registration metadata as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub registrar_name: String,
    pub creation_date: String,
    pub expiration_date: String,
}

// --- Scan Result Models ---

/// TLS section of a scan result. Either every field is set or none is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslInfo {
    pub valid: Option<bool>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
}

impl SslInfo {
    pub fn is_populated(&self) -> bool {
        self.valid.is_some()
    }
}

impl From<Option<CertificateWindow>> for SslInfo {
    fn from(window: Option<CertificateWindow>) -> Self {
        match window {
            Some(w) => Self {
                valid: Some(w.valid),
                valid_from: Some(w.valid_from),
                valid_to: Some(w.valid_to),
                days_remaining: Some(w.days_remaining),
            },
            None => Self::default(),
        }
    }
}

/// Registration section of a scan result. Same all-or-nothing rule as `SslInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoisInfo {
    pub registrar_name: Option<String>,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
}

impl WhoisInfo {
    pub fn is_populated(&self) -> bool {
        self.registrar_name.is_some()
    }
}

impl From<Option<Registration>> for WhoisInfo {
    fn from(registration: Option<Registration>) -> Self {
        match registration {
            Some(r) => Self {
                registrar_name: Some(r.registrar_name),
                creation_date: Some(r.creation_date),
                expiration_date: Some(r.expiration_date),
            },
            None => Self::default(),
        }
    }
}

/// The composite record produced by one successful orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub domain: CanonicalDomain,
    pub ip: Option<String>,
    pub ssl: SslInfo,
    pub whois: WhoisInfo,
    pub timestamp: DateTime<Utc>,
}

impl ScanResult {
    pub fn assemble(
        domain: CanonicalDomain,
        ip: Option<IpAddr>,
        certificate: Option<CertificateWindow>,
        registration: Option<Registration>,
    ) -> Self {
        Self {
            domain,
            ip: ip.map(|addr| addr.to_string()),
            ssl: certificate.into(),
            whois: registration.into(),
            timestamp: Utc::now(),
        }
    }
}

// --- Batch Models ---

/// One entry of a batch run. `result` and `error` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl BatchRecord {
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<BatchRecord>,
    pub summary: BatchSummary,
}
