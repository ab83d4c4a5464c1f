//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::get_data_dir;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub batch: BatchConfig,
    pub rdap: RdapConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Per-adapter limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub dns_timeout_secs: u64,
    pub tls_timeout_secs: u64,
    pub rdap_timeout_secs: u64,
    pub tls_port: u16,
    /// Optional bound applied to every adapter of a scan on top of its own timeout.
    pub scan_timeout_secs: Option<u64>,
}

impl ScanConfig {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_timeout_secs)
    }

    pub fn rdap_timeout(&self) -> Duration {
        Duration::from_secs(self.rdap_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dns_timeout_secs: 5,
            tls_timeout_secs: 10,
            rdap_timeout_secs: 10,
            tls_port: 443,
            scan_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

/// RDAP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RdapConfig {
    /// TLD to RDAP base URL; the domain name is appended to the base.
    pub endpoints: HashMap<String, String>,
    /// Consult the IANA bootstrap registry for TLDs missing from `endpoints`.
    pub bootstrap: bool,
    pub bootstrap_url: String,
}

impl Default for RdapConfig {
    fn default() -> Self {
        let endpoints = [
            ("com", "https://rdap.verisign.com/com/v1/domain/"),
            ("net", "https://rdap.verisign.com/net/v1/domain/"),
        ]
        .into_iter()
        .map(|(tld, url)| (tld.to_string(), url.to_string()))
        .collect();

        Self {
            endpoints,
            bootstrap: false,
            bootstrap_url: "https://data.iana.org/rdap/dns.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Result store file; defaults to `results.db` in the data directory.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| get_data_dir().join("results.db"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for `domain-recon.log`; defaults to the data directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("DOMAIN_RECON").separator("__"))
            .build()?
            .try_deserialize()
    }
}
