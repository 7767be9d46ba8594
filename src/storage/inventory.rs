//! Asset inventory with merge-on-upsert semantics.
//!
//! Assets are keyed by hostname and own their port records, which are
//! keyed by `(ip, port)`. Re-recording a known asset or port only fills in
//! fields that carry a value; an empty string, an empty list or a zero
//! status code never overwrites what is already stored.

use crate::error::{StorageError, StorageResult};
use crate::types::{host_from_url, Finding, OpenPort, Port, PortService, Protocol, WebService};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether an upsert created a record or merged into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// A host and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub domain: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub ports: Vec<PortRecord>,
}

impl Asset {
    fn new(domain: &str, now: DateTime<Utc>) -> Self {
        Self {
            domain: domain.to_string(),
            url: String::new(),
            ip: String::new(),
            status_code: 0,
            title: String::new(),
            technologies: Vec::new(),
            last_seen: now,
            created_at: now,
            updated_at: now,
            ports: Vec::new(),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = now;
        self.updated_at = now;
    }

    /// Whether the prober has ever reached this asset.
    pub fn is_live(&self) -> bool {
        !self.url.is_empty()
    }
}

/// One open port on an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    /// Host name the port was found under, if any.
    #[serde(default)]
    pub domain: String,
    pub ip: String,
    pub port: Port,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PortRecord {
    /// `service version`, or just the service.
    pub fn service_label(&self) -> String {
        match (self.service.is_empty(), self.version.is_empty()) {
            (false, false) => format!("{} {}", self.service, self.version),
            (false, true) => self.service.clone(),
            _ => String::new(),
        }
    }

    /// The host name if known, otherwise the IP.
    pub fn host(&self) -> &str {
        if self.domain.is_empty() {
            &self.ip
        } else {
            &self.domain
        }
    }
}

/// Fields a port upsert may carry.
struct PortUpdate<'a> {
    domain: &'a str,
    ip: &'a str,
    port: Port,
    protocol: Option<Protocol>,
    service: &'a str,
    version: &'a str,
}

/// All known assets, keyed by hostname.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    assets: BTreeMap<String, Asset>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a bare asset for `host`.
    pub fn record_domain(&mut self, host: &str) -> StorageResult<Upsert> {
        if host.is_empty() {
            return Err(StorageError::MissingKey {
                kind: "domain",
                field: "hostname",
            });
        }
        let now = Utc::now();
        let (asset, upsert) = self.entry(host, now);
        if upsert == Upsert::Updated {
            asset.touch(now);
        }
        Ok(upsert)
    }

    /// Upsert the asset named by `web.domain`, or by the URL's host when the
    /// prober left the domain blank, merging probe fields.
    pub fn record_web_service(&mut self, web: &WebService) -> StorageResult<Upsert> {
        let key = if web.domain.is_empty() {
            host_from_url(&web.url)
        } else {
            web.domain.as_str()
        };
        if key.is_empty() {
            return Err(StorageError::MissingKey {
                kind: "web service",
                field: "domain",
            });
        }
        let now = Utc::now();
        let (asset, upsert) = self.entry(key, now);

        merge_str(&mut asset.url, &web.url);
        merge_str(&mut asset.ip, &web.ip);
        merge_str(&mut asset.title, &web.title);
        if web.status_code > 0 {
            asset.status_code = web.status_code;
        }
        if !web.technologies.is_empty() {
            asset.technologies = web.technologies.clone();
        }
        asset.touch(now);

        Ok(upsert)
    }

    pub fn record_open_port(&mut self, open: &OpenPort) -> StorageResult<Upsert> {
        self.upsert_port(PortUpdate {
            domain: &open.host,
            ip: &open.ip,
            port: open.port,
            protocol: None,
            service: "",
            version: "",
        })
    }

    pub fn record_port_service(&mut self, svc: &PortService) -> StorageResult<Upsert> {
        self.upsert_port(PortUpdate {
            domain: &svc.domain,
            ip: &svc.ip,
            port: svc.port,
            protocol: Some(svc.protocol),
            service: &svc.service,
            version: &svc.version,
        })
    }

    /// Persist one finding. Screenshot batches are not stored here and
    /// return `Ok(None)`.
    pub fn apply(&mut self, finding: &Finding) -> StorageResult<Option<Upsert>> {
        match finding {
            Finding::Domain(host) => self.record_domain(host).map(Some),
            Finding::WebService(web) => self.record_web_service(web).map(Some),
            Finding::OpenPort(open) => self.record_open_port(open).map(Some),
            Finding::PortService(svc) => self.record_port_service(svc).map(Some),
            Finding::Screenshot(_) => Ok(None),
        }
    }

    pub fn asset(&self, domain: &str) -> Option<&Asset> {
        self.assets.get(domain)
    }

    /// Assets ordered by hostname.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Assets, most recently created first.
    pub fn assets_newest_first(&self) -> Vec<&Asset> {
        let mut assets: Vec<&Asset> = self.assets.values().collect();
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.domain.cmp(&b.domain)));
        assets
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn port_count(&self) -> usize {
        self.assets.values().map(|a| a.ports.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets created at or after `since`.
    pub fn assets_created_since(&self, since: DateTime<Utc>) -> Vec<&Asset> {
        self.assets_newest_first()
            .into_iter()
            .filter(|a| a.created_at >= since)
            .collect()
    }

    /// Port records created at or after `since`.
    pub fn ports_created_since(&self, since: DateTime<Utc>) -> Vec<&PortRecord> {
        self.assets
            .values()
            .flat_map(|a| a.ports.iter())
            .filter(|p| p.created_at >= since)
            .collect()
    }

    fn entry(&mut self, key: &str, now: DateTime<Utc>) -> (&mut Asset, Upsert) {
        let upsert = if self.assets.contains_key(key) {
            Upsert::Updated
        } else {
            Upsert::Created
        };
        let asset = self
            .assets
            .entry(key.to_string())
            .or_insert_with(|| Asset::new(key, now));
        (asset, upsert)
    }

    fn upsert_port(&mut self, update: PortUpdate<'_>) -> StorageResult<Upsert> {
        if update.ip.is_empty() {
            return Err(StorageError::MissingKey {
                kind: "port",
                field: "ip",
            });
        }
        let now = Utc::now();
        let key = if update.domain.is_empty() {
            update.ip
        } else {
            update.domain
        };

        let (asset, _) = self.entry(key, now);
        merge_str(&mut asset.ip, update.ip);

        let existing = asset
            .ports
            .iter_mut()
            .find(|p| p.ip == update.ip && p.port == update.port);

        match existing {
            Some(record) => {
                merge_str(&mut record.domain, update.domain);
                merge_str(&mut record.service, update.service);
                merge_str(&mut record.version, update.version);
                if let Some(protocol) = update.protocol {
                    record.protocol = protocol;
                }
                record.last_seen = now;
                record.updated_at = now;
                Ok(Upsert::Updated)
            }
            None => {
                asset.ports.push(PortRecord {
                    domain: update.domain.to_string(),
                    ip: update.ip.to_string(),
                    port: update.port,
                    protocol: update.protocol.unwrap_or_default(),
                    service: update.service.to_string(),
                    version: update.version.to_string(),
                    last_seen: now,
                    created_at: now,
                    updated_at: now,
                });
                asset.ports.sort_by_key(|p| p.port);
                Ok(Upsert::Created)
            }
        }
    }
}

fn merge_str(field: &mut String, value: &str) {
    if !value.is_empty() {
        *field = value.to_string();
    }
}
