//! Hostname helpers and target list parsing.

use std::fmt;

/// Error type for target list parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid domain on line {line}: {value}")]
    InvalidDomain { line: usize, value: String },
    #[error("domain list is empty")]
    Empty,
}

/// The root domains a run starts from.
///
/// Parsed from a single `-d` value or a domain list file, where blank lines
/// and `#` comments are ignored. Duplicates are dropped, first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetList {
    domains: Vec<String>,
}

impl TargetList {
    /// A list holding one domain.
    pub fn single(domain: &str) -> Result<Self, TargetError> {
        Self::parse(domain)
    }

    /// Parse newline-separated domains.
    pub fn parse(content: &str) -> Result<Self, TargetError> {
        let mut domains: Vec<String> = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let domain = line.trim_end_matches('.').to_ascii_lowercase();
            if !is_valid_hostname(&domain) {
                return Err(TargetError::InvalidDomain {
                    line: index + 1,
                    value: line.to_string(),
                });
            }
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }

        if domains.is_empty() {
            return Err(TargetError::Empty);
        }

        Ok(Self { domains })
    }

    /// Parsed domains in input order.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Consume into the token list fed to the pipeline.
    pub fn into_tokens(self) -> Vec<String> {
        self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl fmt::Display for TargetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.domains.as_slice() {
            [only] => write!(f, "{}", only),
            many => write!(f, "{} domains", many.len()),
        }
    }
}

/// The last two dot-separated labels of `host`.
///
/// `app.foo.example.com` becomes `example.com`; hosts with fewer than two
/// labels come back unchanged.
pub fn root_domain(host: &str) -> String {
    let host = host.trim_end_matches('.');
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.to_string()
    }
}

/// Extract the host part of a URL (no scheme, credentials, port or path).
pub fn host_from_url(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    if let Some(bracketed) = authority.strip_prefix('[') {
        return bracketed.split(']').next().unwrap_or(bracketed);
    }
    authority.split(':').next().unwrap_or(authority)
}

/// Check if a string is a valid hostname.
pub fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && label.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_domain() {
        assert_eq!(root_domain("app.foo.example.com"), "example.com");
        assert_eq!(root_domain("example.com"), "example.com");
        assert_eq!(root_domain("localhost"), "localhost");
        assert_eq!(root_domain("www.example.com."), "example.com");
    }

    #[test]
    fn test_host_from_url() {
        assert_eq!(host_from_url("https://a.example.com/login?x=1"), "a.example.com");
        assert_eq!(host_from_url("http://a.example.com:8080"), "a.example.com");
        assert_eq!(host_from_url("http://user:pw@b.example.com/"), "b.example.com");
        assert_eq!(host_from_url("http://[::1]:8080/"), "::1");
        assert_eq!(host_from_url("c.example.com"), "c.example.com");
    }

    #[test]
    fn test_target_list_skips_comments_and_blanks() {
        let list = TargetList::parse("# scope\nexample.com\n\n  Other.COM  \nexample.com\n").unwrap();
        assert_eq!(list.domains(), ["example.com", "other.com"]);
        assert_eq!(list.to_string(), "2 domains");
    }

    #[test]
    fn test_target_list_errors() {
        assert_eq!(TargetList::parse("# nothing\n\n"), Err(TargetError::Empty));
        assert_eq!(
            TargetList::parse("example.com\n-bad-.com"),
            Err(TargetError::InvalidDomain {
                line: 2,
                value: "-bad-.com".to_string()
            })
        );
    }

    #[test]
    fn test_valid_hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("sub-1.example.com"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("-invalid.com"));
        assert!(!is_valid_hostname("a..b"));
    }
}
