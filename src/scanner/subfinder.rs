//! Subfinder adapter.
//!
//! Passive subdomain enumeration. Emits one [`Finding::Domain`] per `host`
//! in subfinder's JSON-lines output.

use crate::error::ScanResult;
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::Finding;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SubfinderLine {
    host: String,
}

/// Subfinder wrapper.
///
/// In batch mode a multi-domain input is handed to a single `-dL` run whose
/// exit status is not checked; otherwise each domain gets its own `-d` run
/// and a failing run fails the scan.
#[derive(Debug, Clone, Default)]
pub struct SubfinderScanner {
    batch: bool,
}

impl SubfinderScanner {
    pub const TOOL: &'static str = "subfinder";

    pub fn new(batch: bool) -> Self {
        Self { batch }
    }

    async fn run_batch(&self, exe: &Path, domains: &[String]) -> ScanResult<Vec<String>> {
        info!(scanner = self.name(), domains = domains.len(), "batch enumeration");
        let list = process::input_file(Self::TOOL, domains)?;

        let mut command = Command::new(exe);
        command
            .arg("-dL")
            .arg(list.path())
            .args(["-all", "-json", "-silent"]);

        let run = process::run(Self::TOOL, command, None).await?;
        run.tolerate_failure();
        hosts(&run.lines)
    }

    async fn run_single(&self, exe: &Path, domain: &str) -> ScanResult<Vec<String>> {
        debug!(scanner = self.name(), domain, "enumerating");
        let mut command = Command::new(exe);
        command
            .arg("-d")
            .arg(domain)
            .args(["-all", "-json", "-silent"]);

        let run = process::run(Self::TOOL, command, None).await?;
        run.ensure_success()?;
        hosts(&run.lines)
    }
}

fn hosts(lines: &[String]) -> ScanResult<Vec<String>> {
    let parsed: Vec<SubfinderLine> = process::parse_json_lines(SubfinderScanner::TOOL, lines)?;
    Ok(parsed
        .into_iter()
        .map(|line| line.host)
        .filter(|host| !host.is_empty())
        .collect())
}

#[async_trait]
impl Scanner for SubfinderScanner {
    fn name(&self) -> &str {
        "Subfinder"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;

        let hosts = if self.batch && input.len() > 1 {
            self.run_batch(&exe, input).await?
        } else {
            let mut all = Vec::new();
            for domain in input {
                let found = self.run_single(&exe, domain).await?;
                debug!(scanner = self.name(), domain = %domain, found = found.len(), "domain done");
                all.extend(found);
            }
            all
        };

        info!(scanner = self.name(), found = hosts.len(), "enumeration finished");
        Ok(hosts.into_iter().map(Finding::Domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_from_json_lines() {
        let lines = vec![
            r#"{"host":"api.example.com","input":"example.com","source":"crtsh"}"#.to_string(),
            r#"{"host":"","input":"example.com","source":"crtsh"}"#.to_string(),
            r#"{"host":"www.example.com","input":"example.com","source":"dnsdumpster"}"#.to_string(),
        ];
        assert_eq!(hosts(&lines).unwrap(), ["api.example.com", "www.example.com"]);
    }

    #[tokio::test]
    async fn test_empty_input_skips_tool() {
        let findings = SubfinderScanner::new(true).execute(&[]).await.unwrap();
        assert!(findings.is_empty());
    }
}
