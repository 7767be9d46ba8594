//! Shosubgo adapter: subdomains from Shodan.

use crate::error::{ScanError, ScanResult};
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::Finding;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

/// Shosubgo wrapper.
///
/// Needs a Shodan API key; without one every non-empty call fails with
/// [`ScanError::Configuration`] before anything is spawned.
#[derive(Clone, Default)]
pub struct ShosubgoScanner {
    api_key: Option<String>,
}

impl ShosubgoScanner {
    pub const TOOL: &'static str = "shosubgo";

    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

impl std::fmt::Debug for ShosubgoScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShosubgoScanner")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl Scanner for ShosubgoScanner {
    fn name(&self) -> &str {
        "Shosubgo"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScanError::Configuration("SHODAN_API_KEY is not set".to_string()))?;
        let exe = process::locate(Self::TOOL)?;

        let mut findings = Vec::new();
        for domain in input {
            let mut command = Command::new(&exe);
            command.arg("-d").arg(domain).arg("-s").arg(key);

            let run = process::run(Self::TOOL, command, None).await?;
            run.tolerate_failure();
            info!(scanner = self.name(), domain = %domain, found = run.lines.len(), "shodan lookup done");

            findings.extend(run.lines.into_iter().map(Finding::Domain));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let scanner = ShosubgoScanner::new(None);
        let err = scanner.execute(&["example.com".to_string()]).await.unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));

        let blank = ShosubgoScanner::new(Some("  ".to_string()));
        let err = blank.execute(&["example.com".to_string()]).await.unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_empty_input_needs_no_key() {
        assert!(ShosubgoScanner::new(None).execute(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_debug_hides_key() {
        let scanner = ShosubgoScanner::new(Some("secret".to_string()));
        assert!(!format!("{:?}", scanner).contains("secret"));
    }
}
