// src/logging.rs

use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", *PROJECT_NAME);
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

pub fn get_data_dir() -> PathBuf {
    ProjectDirs::from("com", "domain-recon", env!("CARGO_PKG_NAME"))
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".data"))
}

/// Log file location: the configured directory, else the data directory.
pub fn log_file_path(config: &LoggingConfig) -> PathBuf {
    config
        .directory
        .clone()
        .unwrap_or_else(get_data_dir)
        .join(LOG_FILE.as_str())
}

/// Picks the filter: `RUST_LOG` wins, then the crate-scoped override, then
/// the configured level applied to this crate only.
fn filter_directive(
    config: &LoggingConfig,
    rust_log: Option<String>,
    scoped: Option<String>,
) -> String {
    rust_log
        .or(scoped)
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| format!("{}={}", env!("CARGO_CRATE_NAME"), config.level))
}

/// Installs a file-only subscriber; stdout is reserved for scan output.
///
/// Each run appends, so the history of separate CLI invocations is kept.
pub fn initialize_logging(config: &LoggingConfig) -> Result<PathBuf> {
    let log_path = log_file_path(config);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .wrap_err_with(|| format!("Failed to open log file {}", log_path.display()))?;

    let directive = filter_directive(
        config,
        std::env::var("RUST_LOG").ok(),
        std::env::var(LOG_ENV.as_str()).ok(),
    );
    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            directory: None,
        }
    }

    #[test]
    fn configured_level_is_scoped_to_the_crate() {
        assert_eq!(filter_directive(&config("debug"), None, None), "domain_recon=debug");
    }

    #[test]
    fn environment_overrides_take_precedence() {
        let cfg = config("info");
        assert_eq!(
            filter_directive(&cfg, Some("warn".into()), Some("trace".into())),
            "warn"
        );
        assert_eq!(filter_directive(&cfg, None, Some("trace".into())), "trace");
        assert_eq!(filter_directive(&cfg, Some("  ".into()), None), "domain_recon=info");
    }

    #[test]
    fn log_file_honours_configured_directory() {
        let cfg = LoggingConfig {
            level: "info".into(),
            directory: Some(PathBuf::from("/var/log/recon")),
        };
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/var/log/recon").join("domain-recon.log")
        );
        assert!(log_file_path(&config("info")).ends_with("domain-recon.log"));
    }
}
