use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "domain-recon", version)]
#[command(about = "Resolve DNS, inspect TLS and fetch registration data for domains.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan one domain or a file of domains
    #[command(alias = "s")]
    Scan {
        /// Domain to scan (or read from --input)
        #[arg(required_unless_present = "input")]
        domain: Option<String>,
        /// File with one domain per line
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Write output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Maximum scans in flight (defaults to the configured value)
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: Option<u16>,
        /// Persist successful results to the result store
        #[arg(long)]
        save: bool,
    },
    /// Inspect stored results
    #[command(alias = "r")]
    Results {
        #[command(subcommand)]
        action: ResultsAction,
    },
}

#[derive(Subcommand)]
pub enum ResultsAction {
    /// Print stored results as JSON, newest first
    List {
        #[arg(long)]
        domain: Option<String>,
        /// RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Export stored results as CSV
    Export {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a stored result by id
    Delete {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        id: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid timestamp `{value}`: expected RFC 3339 or YYYY-MM-DD"))
}
