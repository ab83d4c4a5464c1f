// src/core/scanner/rdap_scanner.rs

use async_trait::async_trait;
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use super::RegistrationLookup;
use crate::config::RdapConfig;
use crate::core::domain::CanonicalDomain;
use crate::core::errors::{AdapterKind, LookupError};
use crate::core::models::{LookupOutcome, Registration};

const CREATION_ACTIONS: &[&str] = &["registration", "creation", "registered"];
const EXPIRATION_ACTIONS: &[&str] = &["expiration", "expire", "expiry"];

// --- RDAP wire types (only the fields we read) ---

#[derive(Debug, Default, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    entities: Vec<RdapEntity>,
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Debug, Deserialize)]
struct RdapEntity {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(rename = "vcardArray")]
    vcard_array: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    event_action: Option<String>,
    #[serde(rename = "eventDate")]
    event_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BootstrapFile {
    services: Vec<Vec<Vec<String>>>,
}

/// Registration lookup over RDAP with a static TLD map and optional IANA bootstrap.
pub struct RdapScanner {
    client: reqwest::Client,
    endpoints: HashMap<String, Url>,
    bootstrap_url: Option<Url>,
    bootstrap: OnceCell<HashMap<String, Url>>,
    timeout: Duration,
}

impl RdapScanner {
    pub fn new(config: &RdapConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build RDAP HTTP client")?;

        let endpoints = config
            .endpoints
            .iter()
            .map(|(tld, base)| {
                let url = endpoint_base(base)
                    .wrap_err_with(|| format!("Invalid RDAP endpoint for .{tld}: {base}"))?;
                Ok((tld.to_lowercase(), url))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let bootstrap_url = if config.bootstrap {
            Some(Url::parse(&config.bootstrap_url).wrap_err("Invalid RDAP bootstrap URL")?)
        } else {
            None
        };

        Ok(Self {
            client,
            endpoints,
            bootstrap_url,
            bootstrap: OnceCell::new(),
            timeout,
        })
    }

    async fn endpoint_for(&self, tld: &str) -> LookupOutcome<Url> {
        if let Some(url) = self.endpoints.get(tld) {
            return Ok(url.clone());
        }

        let unsupported = || LookupError::UnsupportedTld {
            tld: tld.to_string(),
        };
        let Some(bootstrap_url) = &self.bootstrap_url else {
            return Err(unsupported());
        };

        let registry = self
            .bootstrap
            .get_or_try_init(|| self.fetch_bootstrap(bootstrap_url))
            .await?;
        registry.get(tld).cloned().ok_or_else(unsupported)
    }

    async fn fetch_bootstrap(&self, url: &Url) -> LookupOutcome<HashMap<String, Url>> {
        info!(url = %url, "Fetching RDAP bootstrap registry.");
        let file: BootstrapFile = self.get_json(url.clone()).await?;

        let mut registry = HashMap::new();
        for service in file.services {
            let [tlds, urls, ..] = service.as_slice() else {
                continue;
            };
            let base = urls
                .iter()
                .find(|u| u.starts_with("https://"))
                .or_else(|| urls.first())
                .and_then(|u| endpoint_base(u).ok())
                .and_then(|u| u.join("domain/").ok());
            if let Some(base) = base {
                for tld in tlds {
                    registry.insert(tld.to_lowercase(), base.clone());
                }
            }
        }
        debug!(tlds = registry.len(), "RDAP bootstrap registry loaded.");
        Ok(registry)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> LookupOutcome<T> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "RDAP request failed.");
            self.request_error(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, %status, "RDAP request returned non-success status.");
            return Err(LookupError::failed(
                AdapterKind::Registration,
                format!("HTTP {status}"),
            ));
        }

        response.json::<T>().await.map_err(|e| self.request_error(e))
    }

    fn request_error(&self, e: reqwest::Error) -> LookupError {
        if e.is_timeout() {
            LookupError::Timeout {
                adapter: AdapterKind::Registration,
                seconds: self.timeout.as_secs(),
            }
        } else {
            LookupError::failed(AdapterKind::Registration, e)
        }
    }
}

#[async_trait]
impl RegistrationLookup for RdapScanner {
    async fn lookup(&self, domain: &CanonicalDomain) -> LookupOutcome<Registration> {
        let base = self.endpoint_for(domain.tld()).await?;
        let url = base
            .join(domain.as_str())
            .map_err(|e| LookupError::failed(AdapterKind::Registration, e))?;

        debug!(domain = %domain, url = %url, "Querying RDAP.");
        let data: RdapDomain = self.get_json(url).await?;

        let registration = extract_registration(&data)?;
        info!(
            domain = %domain,
            registrar = %registration.registrar_name,
            "Registration data found."
        );
        Ok(registration)
    }
}

/// Parses `base` and makes sure relative joins append to its path.
fn endpoint_base(base: &str) -> Result<Url, url::ParseError> {
    if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{base}/"))
    }
}

fn extract_registration(data: &RdapDomain) -> LookupOutcome<Registration> {
    let registrar_name = extract_registrar_name(&data.entities)
        .ok_or(LookupError::MissingField { field: "registrar" })?;
    let creation_date = extract_event_date(&data.events, CREATION_ACTIONS)
        .ok_or(LookupError::MissingField { field: "creation date" })?;
    let expiration_date = extract_event_date(&data.events, EXPIRATION_ACTIONS)
        .ok_or(LookupError::MissingField { field: "expiration date" })?;

    Ok(Registration {
        registrar_name,
        creation_date,
        expiration_date,
    })
}

/// Display name of the first `registrar` entity: vCard `fn`, falling back to `org`.
fn extract_registrar_name(entities: &[RdapEntity]) -> Option<String> {
    let registrar = entities
        .iter()
        .find(|e| e.roles.iter().any(|r| r == "registrar"))?;
    let items = registrar.vcard_array.as_ref()?.get(1)?.as_array()?;

    let property = |name: &str| {
        items.iter().find_map(|item| {
            let item = item.as_array().filter(|i| i.len() >= 4)?;
            if item[0].as_str()? != name {
                return None;
            }
            let value = item[3].as_str()?.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    };

    property("fn").or_else(|| property("org"))
}

/// Date of the first event matching `actions`, tried in priority order.
fn extract_event_date(events: &[RdapEvent], actions: &[&str]) -> Option<String> {
    actions.iter().find_map(|action| {
        events
            .iter()
            .find(|ev| ev.event_action.as_deref() == Some(*action))
            .and_then(|ev| ev.event_date.clone())
    })
}
