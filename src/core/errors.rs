//! Error types shared by the scanning core.

use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Which external lookup produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum AdapterKind {
    Dns,
    Tls,
    Registration,
}

/// Errors surfaced to callers of `Scanner::scan_domain`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Domain is required")]
    EmptyInput,

    #[error("Invalid domain format")]
    InvalidDomain,

    #[error("SCAN_FAILED")]
    ScanFailed,
}

impl ScanError {
    /// Stable machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::EmptyInput => "EMPTY_INPUT",
            ScanError::InvalidDomain => "INVALID_DOMAIN",
            ScanError::ScanFailed => "SCAN_FAILED",
        }
    }

    /// HTTP status an API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ScanError::EmptyInput | ScanError::InvalidDomain => 400,
            ScanError::ScanFailed => 500,
        }
    }
}

/// Failure of a single adapter. Absorbed inside the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{adapter} lookup timed out after {seconds}s")]
    Timeout { adapter: AdapterKind, seconds: u64 },

    #[error("{adapter} lookup failed: {reason}")]
    Failed { adapter: AdapterKind, reason: String },

    #[error("no registration endpoint for .{tld}")]
    UnsupportedTld { tld: String },

    #[error("registration response missing {field}")]
    MissingField { field: &'static str },
}

impl LookupError {
    pub fn failed(adapter: AdapterKind, reason: impl ToString) -> Self {
        LookupError::Failed {
            adapter,
            reason: reason.to_string(),
        }
    }

    pub fn adapter(&self) -> AdapterKind {
        match self {
            LookupError::Timeout { adapter, .. } | LookupError::Failed { adapter, .. } => *adapter,
            LookupError::UnsupportedTld { .. } | LookupError::MissingField { .. } => {
                AdapterKind::Registration
            }
        }
    }
}
