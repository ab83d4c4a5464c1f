//! Turns untrusted input into a canonical FQDN.
//!
//! Every entry point (CLI, batch runner, orchestrator) goes through
//! `CanonicalDomain::parse`, so there is exactly one validation policy.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::ScanError;

const MAX_DOMAIN_LEN: usize = 253;

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9+.-]*://").expect("scheme pattern"));
static LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9-]{1,63}$").expect("label pattern"));
static TLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[a-z]{2,}$").expect("tld pattern"));

/// Strips scheme, credentials, path, query, fragment, port and trailing dots.
///
/// The result is lowercase but not necessarily valid; see [`is_valid`].
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut d: &str = &lowered;

    if let Some(m) = SCHEME.find(d) {
        d = &d[m.end()..];
    }
    if let Some(end) = d.find(['/', '?', '#']) {
        d = &d[..end];
    }
    if let Some(at) = d.rfind('@') {
        d = &d[at + 1..];
    }
    if let Some(colon) = d.find(':') {
        d = &d[..colon];
    }

    // Trailing dots and whitespace exposed by the truncations above.
    d.trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .trim_start()
        .to_string()
}

/// FQDN check: at least two labels, RFC 1035 label syntax, alphabetic TLD.
pub fn is_valid(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels
        .iter()
        .all(|label| LABEL.is_match(label) && !label.starts_with('-') && !label.ends_with('-'));
    if !labels_ok {
        return false;
    }

    labels.last().is_some_and(|tld| TLD.is_match(tld))
}

/// A normalized, validated, lowercase domain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalDomain(String);

impl CanonicalDomain {
    pub fn parse(raw: &str) -> Result<Self, ScanError> {
        if raw.trim().is_empty() {
            return Err(ScanError::EmptyInput);
        }
        let normalized = normalize(raw);
        if !is_valid(&normalized) {
            return Err(ScanError::InvalidDomain);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The top-level label, e.g. `com`.
    pub fn tld(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CanonicalDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CanonicalDomain {
    type Error = ScanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CanonicalDomain> for String {
    fn from(domain: CanonicalDomain) -> Self {
        domain.0
    }
}
