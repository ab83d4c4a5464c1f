//! SQLite-backed result store.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use super::{ResultQuery, ResultStore, StoreError, StoredResult};
use crate::core::models::ScanResult;

const CREATE_RESULTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        domain TEXT NOT NULL,
        ip TEXT,
        ssl_valid INTEGER NOT NULL,
        ssl_valid_from TEXT NOT NULL,
        ssl_valid_to TEXT NOT NULL,
        ssl_days_remaining INTEGER NOT NULL,
        registrar TEXT,
        whois_creation_date TEXT,
        whois_expiration_date TEXT,
        created_at TEXT NOT NULL
    )
"#;

const CREATE_RESULTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS results_domain_created_at ON results (domain, created_at)";

/// Wait for other writers (other processes included) before failing with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Stores rows in one SQLite file. Ids come from `AUTOINCREMENT`, so they
/// are unique across every handle on the file and never reused.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_RESULTS_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_RESULTS_INDEX).execute(&pool).await?;

        info!(path = %path.display(), "Opened result store.");
        Ok(Self { pool })
    }
}

/// Fixed-width UTC text, so lexical order in SQL equals time order.
fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_stored(row: &SqliteRow) -> Result<StoredResult, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(StoredResult {
        id: row.try_get::<i64, _>("id")? as u64,
        domain: row.try_get("domain")?,
        ip: row.try_get("ip")?,
        ssl_valid: u8::from(row.try_get::<i64, _>("ssl_valid")? != 0),
        ssl_valid_from: row.try_get("ssl_valid_from")?,
        ssl_valid_to: row.try_get("ssl_valid_to")?,
        ssl_days_remaining: row.try_get("ssl_days_remaining")?,
        registrar: row.try_get("registrar")?,
        whois_creation_date: row.try_get("whois_creation_date")?,
        whois_expiration_date: row.try_get("whois_expiration_date")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn insert(&self, scan: &ScanResult) -> Result<u64, StoreError> {
        let row = StoredResult::from_scan(0, scan);

        let done = sqlx::query(
            r#"
            INSERT INTO results (
                domain, ip, ssl_valid, ssl_valid_from, ssl_valid_to, ssl_days_remaining,
                registrar, whois_creation_date, whois_expiration_date, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.domain)
        .bind(&row.ip)
        .bind(i64::from(row.ssl_valid))
        .bind(&row.ssl_valid_from)
        .bind(&row.ssl_valid_to)
        .bind(row.ssl_days_remaining)
        .bind(&row.registrar)
        .bind(&row.whois_creation_date)
        .bind(&row.whois_expiration_date)
        .bind(timestamp_text(&row.created_at))
        .execute(&self.pool)
        .await?;

        let id = done.last_insert_rowid() as u64;
        debug!(id, domain = %scan.domain, "Stored scan result.");
        Ok(id)
    }

    async fn list(&self, query: &ResultQuery) -> Result<Vec<StoredResult>, StoreError> {
        let domain = query.domain.as_deref().map(str::to_lowercase);
        let since = query.since.as_ref().map(timestamp_text);
        // SQLite reads a negative LIMIT as "no limit".
        let limit = query
            .limit
            .and_then(|l| i64::try_from(l).ok())
            .unwrap_or(-1);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT * FROM results
            WHERE (? IS NULL OR domain = ?)
              AND (? IS NULL OR created_at >= ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&domain)
        .bind(&domain)
        .bind(&since)
        .bind(&since)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_stored).collect()
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(false);
        };
        let done = sqlx::query("DELETE FROM results WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(id, removed = done.rows_affected(), "Deleted scan result.");
        Ok(done.rows_affected() > 0)
    }
}
