//! CSV export of stored scan results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::models::BatchRecord;
use crate::storage::{ResultQuery, ResultStore, StoreError, StoredResult};

/// Hard ceiling on exported rows.
pub const MAX_EXPORT_ROWS: usize = 50_000;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("limit must be a positive integer")]
    InvalidLimit,

    #[error("Failed to read results: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to generate CSV export: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to generate CSV export: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to encode scan result: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ExportQuery {
    pub domain: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: u64,
    domain: &'a str,
    created_at: String,
    ip: Option<&'a str>,
    ssl_valid: u8,
    ssl_valid_from: &'a str,
    ssl_valid_to: &'a str,
    ssl_days_remaining: i64,
    registrar: Option<&'a str>,
    #[serde(rename = "whois_creationDate")]
    whois_creation_date: Option<&'a str>,
    #[serde(rename = "whois_expirationDate")]
    whois_expiration_date: Option<&'a str>,
}

impl<'a> From<&'a StoredResult> for ExportRow<'a> {
    fn from(row: &'a StoredResult) -> Self {
        Self {
            id: row.id,
            domain: &row.domain,
            created_at: row.created_at.to_rfc3339(),
            ip: row.ip.as_deref(),
            ssl_valid: row.ssl_valid,
            ssl_valid_from: &row.ssl_valid_from,
            ssl_valid_to: &row.ssl_valid_to,
            ssl_days_remaining: row.ssl_days_remaining,
            registrar: row.registrar.as_deref(),
            whois_creation_date: row.whois_creation_date.as_deref(),
            whois_expiration_date: row.whois_expiration_date.as_deref(),
        }
    }
}

/// Renders stored results as CSV with a `#`-comment preamble.
pub async fn export_csv(
    store: &dyn ResultStore,
    query: ExportQuery,
) -> Result<String, ExportError> {
    let limit = match query.limit {
        Some(0) => return Err(ExportError::InvalidLimit),
        Some(n) => n.min(MAX_EXPORT_ROWS),
        None => MAX_EXPORT_ROWS,
    };

    let rows = store
        .list(&ResultQuery {
            domain: query.domain,
            since: query.since,
            limit: Some(limit),
            offset: query.offset,
        })
        .await?;

    if rows.len() == MAX_EXPORT_ROWS {
        warn!(requested = ?query.limit, "Export hit hard limit of {MAX_EXPORT_ROWS} rows.");
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(EXPORT_COLUMNS)?;
    }
    for row in &rows {
        writer.serialize(ExportRow::from(row))?;
    }
    let body = finish(writer)?;

    let cap_note = if limit == MAX_EXPORT_ROWS { " (hard maximum)" } else { "" };
    let preamble = [
        "# Domain Results Export".to_string(),
        format!("# Generated: {}", Utc::now().to_rfc3339()),
        format!("# Total rows exported: {}", rows.len()),
        format!("# Applied limit: {limit}{cap_note}"),
        format!("# Offset: {}", query.offset),
        String::new(),
    ]
    .join("\n");

    info!(rows = rows.len(), limit, offset = query.offset, "Generated CSV export.");
    Ok(format!("{preamble}\n{body}"))
}

const EXPORT_COLUMNS: [&str; 11] = [
    "id",
    "domain",
    "created_at",
    "ip",
    "ssl_valid",
    "ssl_valid_from",
    "ssl_valid_to",
    "ssl_days_remaining",
    "registrar",
    "whois_creationDate",
    "whois_expirationDate",
];

/// Renders batch output as `domain,error,timestamp,result` with the result as compact JSON.
pub fn batch_to_csv(records: &[BatchRecord]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["domain", "error", "timestamp", "result"])?;
    for record in records {
        let result = match &record.result {
            Some(result) => serde_json::to_string(result)?,
            None => "{}".to_string(),
        };
        writer.write_record([
            record.domain.as_str(),
            record.error.as_deref().unwrap_or(""),
            record.timestamp.to_rfc3339().as_str(),
            result.as_str(),
        ])?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}
