//! Typed results that flow between pipeline stages.
//!
//! Every scanner emits [`Finding`]s. The payload shape is fixed by the
//! variant, so stage code matches exhaustively instead of inspecting
//! loosely-typed values.

use super::port::Port;
use super::token::PortToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One discovered fact.
///
/// Serializes as `{"kind": "...", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Finding {
    /// A bare hostname.
    Domain(String),
    /// A responsive HTTP service.
    WebService(WebService),
    /// An open port found by the sweep.
    OpenPort(OpenPort),
    /// A fingerprinted service behind an open port.
    PortService(PortService),
    /// A batch of screenshots for one root domain.
    Screenshot(ScreenshotBatch),
}

/// Discriminant of a [`Finding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Domain,
    WebService,
    OpenPort,
    PortService,
    Screenshot,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Domain => "domain",
            Self::WebService => "web_service",
            Self::OpenPort => "open_port",
            Self::PortService => "port_service",
            Self::Screenshot => "screenshot",
        };
        f.write_str(name)
    }
}

impl Finding {
    pub fn domain(host: impl Into<String>) -> Self {
        Self::Domain(host.into())
    }

    pub fn kind(&self) -> FindingKind {
        match self {
            Self::Domain(_) => FindingKind::Domain,
            Self::WebService(_) => FindingKind::WebService,
            Self::OpenPort(_) => FindingKind::OpenPort,
            Self::PortService(_) => FindingKind::PortService,
            Self::Screenshot(_) => FindingKind::Screenshot,
        }
    }

    /// Token handed to the next serial stage.
    ///
    /// Only string payloads propagate; structured payloads end the chain for
    /// that finding.
    pub fn as_token(&self) -> Option<String> {
        match self {
            Self::Domain(host) => Some(host.clone()),
            Self::WebService(_) | Self::OpenPort(_) | Self::PortService(_) | Self::Screenshot(_) => {
                None
            }
        }
    }

    /// Token handed to the next member of the port-scan chain.
    pub fn port_token(&self) -> Option<String> {
        match self {
            Self::OpenPort(open) => Some(PortToken::from(open).to_string()),
            Self::PortService(svc) => Some(PortToken::from(svc).to_string()),
            Self::Domain(_) | Self::WebService(_) | Self::Screenshot(_) => None,
        }
    }

    /// The host this finding is about, for display.
    pub fn subject(&self) -> &str {
        match self {
            Self::Domain(host) => host,
            Self::WebService(web) => &web.url,
            Self::OpenPort(open) if !open.host.is_empty() => &open.host,
            Self::OpenPort(open) => &open.ip,
            Self::PortService(svc) if !svc.domain.is_empty() => &svc.domain,
            Self::PortService(svc) => &svc.ip,
            Self::Screenshot(batch) => &batch.root_domain,
        }
    }
}

/// A live HTTP endpoint as reported by the prober.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebService {
    pub url: String,
    pub status_code: u16,
    pub title: String,
    /// Detected technologies, in the prober's order.
    #[serde(default)]
    pub technologies: Vec<String>,
    pub ip: String,
    pub domain: String,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPort {
    pub host: String,
    pub ip: String,
    pub port: Port,
}

/// Transport protocol of a fingerprinted port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    /// Parse a protocol label, defaulting to TCP for anything but `udp`.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("udp") {
            Self::Udp
        } else {
            Self::Tcp
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortService {
    pub ip: String,
    pub port: Port,
    #[serde(default)]
    pub protocol: Protocol,
    pub service: String,
    pub version: String,
    pub domain: String,
}

/// Summary of one screenshot run for a root domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotBatch {
    pub root_domain: String,
    pub screenshot_count: usize,
    pub screenshot_dir: PathBuf,
    pub database_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_port(host: &str, ip: &str, port: u16) -> Finding {
        Finding::OpenPort(OpenPort {
            host: host.to_string(),
            ip: ip.to_string(),
            port: Port::new(port).unwrap(),
        })
    }

    #[test]
    fn test_open_port_becomes_chain_token() {
        let finding = open_port("h", "1.2.3.4", 22);
        assert_eq!(finding.port_token().as_deref(), Some("1.2.3.4:22:h"));
        assert_eq!(finding.as_token(), None);
    }

    #[test]
    fn test_open_port_without_host() {
        let finding = open_port("", "10.0.0.5", 8080);
        assert_eq!(finding.port_token().as_deref(), Some("10.0.0.5:8080"));
        assert_eq!(finding.subject(), "10.0.0.5");
    }

    #[test]
    fn test_only_domains_propagate_as_tokens() {
        assert_eq!(
            Finding::domain("a.example.com").as_token().as_deref(),
            Some("a.example.com")
        );
        let batch = Finding::Screenshot(ScreenshotBatch {
            root_domain: "example.com".to_string(),
            screenshot_count: 3,
            screenshot_dir: PathBuf::from("/tmp/example.com/screenshots"),
            database_path: PathBuf::from("/tmp/example.com/gowitness.sqlite3"),
        });
        assert_eq!(batch.as_token(), None);
        assert_eq!(batch.port_token(), None);
    }

    #[test]
    fn test_serialized_shape_is_kind_and_payload() {
        let json = serde_json::to_value(Finding::domain("a.example.com")).unwrap();
        assert_eq!(json["kind"], "domain");
        assert_eq!(json["payload"], "a.example.com");

        let json = serde_json::to_value(open_port("h", "1.2.3.4", 22)).unwrap();
        assert_eq!(json["kind"], "open_port");
        assert_eq!(json["payload"]["port"], 22);
    }

    #[test]
    fn test_protocol_label() {
        assert_eq!(Protocol::from_label("UDP"), Protocol::Udp);
        assert_eq!(Protocol::from_label("tcp"), Protocol::Tcp);
        assert_eq!(Protocol::from_label("sctp"), Protocol::Tcp);
    }
}
