//! String tokens exchanged between stages.
//!
//! Three formats cross stage boundaries: bare hostnames, `ip:port[:host]`
//! for the port-scan chain, and `url|root_domain` for screenshots.

use super::finding::{OpenPort, PortService, WebService};
use super::host::{host_from_url, root_domain};
use super::port::Port;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed port token: {0}")]
    MalformedPort(String),
    #[error("malformed screenshot token: {0}")]
    MalformedScreenshot(String),
}

/// An `ip:port[:host]` token.
///
/// IPv6 addresses are written in brackets (`[::1]:22:host`) so the colon
/// separators stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortToken {
    pub ip: String,
    pub port: Port,
    pub host: Option<String>,
}

impl PortToken {
    fn new(ip: &str, port: Port, host: &str) -> Self {
        Self {
            ip: ip.to_string(),
            port,
            host: (!host.is_empty()).then(|| host.to_string()),
        }
    }
}

impl From<&OpenPort> for PortToken {
    fn from(open: &OpenPort) -> Self {
        Self::new(&open.ip, open.port, &open.host)
    }
}

impl From<&PortService> for PortToken {
    fn from(svc: &PortService) -> Self {
        Self::new(&svc.ip, svc.port, &svc.domain)
    }
}

impl fmt::Display for PortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{}", self.ip, self.port)?;
        } else {
            write!(f, "{}:{}", self.ip, self.port)?;
        }
        if let Some(host) = &self.host {
            write!(f, ":{}", host)?;
        }
        Ok(())
    }
}

impl FromStr for PortToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TokenError::MalformedPort(s.to_string());

        let (ip, rest) = match s.strip_prefix('[') {
            Some(bracketed) => {
                let (ip, rest) = bracketed.split_once(']').ok_or_else(malformed)?;
                (ip, rest.strip_prefix(':').ok_or_else(malformed)?)
            }
            None => s.split_once(':').ok_or_else(malformed)?,
        };

        if ip.is_empty() || (ip.contains(':') && ip.parse::<IpAddr>().is_err()) {
            return Err(malformed());
        }

        let (port, host) = match rest.split_once(':') {
            Some((port, host)) => (port, host),
            None => (rest, ""),
        };
        let port: Port = port.parse().map_err(|_| malformed())?;

        Ok(Self::new(ip, port, host))
    }
}

/// A `url|root_domain` token for the screenshot stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotToken {
    pub url: String,
    pub root_domain: String,
}

impl ScreenshotToken {
    /// Build the token for a live web service.
    ///
    /// The root domain comes from the service's host name, falling back to
    /// the URL when the prober did not report one.
    pub fn from_web_service(web: &WebService) -> Self {
        let host = if web.domain.is_empty() {
            host_from_url(&web.url)
        } else {
            web.domain.as_str()
        };
        Self {
            url: web.url.clone(),
            root_domain: root_domain(host),
        }
    }
}

impl fmt::Display for ScreenshotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.url, self.root_domain)
    }
}

impl FromStr for ScreenshotToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some((url, root)) if !url.is_empty() && !root.is_empty() => Ok(Self {
                url: url.to_string(),
                root_domain: root.to_string(),
            }),
            _ => Err(TokenError::MalformedScreenshot(s.to_string())),
        }
    }
}

/// Screenshot tokens that share a root domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDomainGroup {
    pub root_domain: String,
    pub urls: Vec<String>,
}

impl RootDomainGroup {
    /// Re-encode the group as `url|root_domain` tokens.
    pub fn tokens(&self) -> Vec<String> {
        self.urls
            .iter()
            .map(|url| format!("{}|{}", url, self.root_domain))
            .collect()
    }
}

/// Group `url|root_domain` tokens by root domain.
///
/// Groups keep first-seen order and URLs keep input order; malformed
/// tokens are skipped.
pub fn group_by_root_domain<S: AsRef<str>>(tokens: &[S]) -> Vec<RootDomainGroup> {
    let mut groups: Vec<RootDomainGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for token in tokens {
        let Ok(parsed) = token.as_ref().parse::<ScreenshotToken>() else {
            tracing::debug!(token = token.as_ref(), "skipping malformed screenshot token");
            continue;
        };
        let slot = *index.entry(parsed.root_domain.clone()).or_insert_with(|| {
            groups.push(RootDomainGroup {
                root_domain: parsed.root_domain.clone(),
                urls: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].urls.push(parsed.url);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_port_token_formats() {
        let token: PortToken = "1.2.3.4:22:h".parse().unwrap();
        assert_eq!(token.ip, "1.2.3.4");
        assert_eq!(token.port.as_u16(), 22);
        assert_eq!(token.host.as_deref(), Some("h"));
        assert_eq!(token.to_string(), "1.2.3.4:22:h");

        let token: PortToken = "10.0.0.1:443".parse().unwrap();
        assert_eq!(token.host, None);
        assert_eq!(token.to_string(), "10.0.0.1:443");
    }

    #[test]
    fn test_port_token_ipv6() {
        let token: PortToken = "[2001:db8::1]:8443:api.example.com".parse().unwrap();
        assert_eq!(token.ip, "2001:db8::1");
        assert_eq!(token.port.as_u16(), 8443);
        assert_eq!(token.to_string(), "[2001:db8::1]:8443:api.example.com");
    }

    #[test]
    fn test_port_token_rejects_garbage() {
        assert!("1.2.3.4".parse::<PortToken>().is_err());
        assert!("1.2.3.4:0".parse::<PortToken>().is_err());
        assert!("1.2.3.4:http:h".parse::<PortToken>().is_err());
        assert!("::1:22".parse::<PortToken>().is_err());
        assert!(":22".parse::<PortToken>().is_err());
    }

    #[test]
    fn test_screenshot_token_from_web_service() {
        let web = WebService {
            url: "https://app.foo.example.com".to_string(),
            status_code: 200,
            title: String::new(),
            technologies: vec![],
            ip: "1.1.1.1".to_string(),
            domain: String::new(),
            discovered_at: Utc::now(),
        };
        let token = ScreenshotToken::from_web_service(&web);
        assert_eq!(token.to_string(), "https://app.foo.example.com|example.com");
    }

    #[test]
    fn test_group_by_root_domain() {
        let tokens = [
            "http://a.example.com|example.com",
            "http://c.other.com|other.com",
            "not-a-token",
            "http://b.example.com|example.com",
        ];
        let groups = group_by_root_domain(&tokens);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].root_domain, "example.com");
        assert_eq!(groups[0].urls, ["http://a.example.com", "http://b.example.com"]);
        assert_eq!(groups[1].tokens(), ["http://c.other.com|other.com"]);
    }
}
