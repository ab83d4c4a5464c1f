//! Persistence boundary for scan results.

pub mod sqlite_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::models::ScanResult;

pub use sqlite_store::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored timestamp is not RFC 3339: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// A persisted scan, flattened with the storage defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: u64,
    pub domain: String,
    pub ip: Option<String>,
    /// 1 when the certificate was valid, otherwise 0.
    pub ssl_valid: u8,
    pub ssl_valid_from: String,
    pub ssl_valid_to: String,
    pub ssl_days_remaining: i64,
    pub registrar: Option<String>,
    pub whois_creation_date: Option<String>,
    pub whois_expiration_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredResult {
    pub fn from_scan(id: u64, scan: &ScanResult) -> Self {
        Self {
            id,
            domain: scan.domain.as_str().to_lowercase(),
            ip: scan.ip.clone(),
            ssl_valid: u8::from(scan.ssl.valid.unwrap_or(false)),
            ssl_valid_from: scan.ssl.valid_from.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ssl_valid_to: scan.ssl.valid_to.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ssl_days_remaining: scan.ssl.days_remaining.unwrap_or(0),
            registrar: scan.whois.registrar_name.clone(),
            whois_creation_date: scan.whois.creation_date.clone(),
            whois_expiration_date: scan.whois.expiration_date.clone(),
            created_at: scan.timestamp,
        }
    }
}

/// Filter for listing stored results. Matches are returned newest first,
/// then `offset` rows are skipped and at most `limit` returned.
#[derive(Debug, Clone, Default)]
pub struct ResultQuery {
    pub domain: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists `scan` and returns its identifier.
    async fn insert(&self, scan: &ScanResult) -> Result<u64, StoreError>;

    async fn list(&self, query: &ResultQuery) -> Result<Vec<StoredResult>, StoreError>;

    /// Returns `false` when no row had this id.
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;
}
