//! Puredns adapter: DNS resolution and wildcard filtering.

use crate::error::ScanResult;
use crate::scanner::process;
use crate::scanner::resolvers::ResolverList;
use crate::scanner::traits::Scanner;
use crate::types::Finding;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

/// Puredns wrapper.
///
/// Refreshes the resolver list, resolves every input host and keeps only
/// those with a real (non-wildcard) answer.
#[derive(Debug, Clone)]
pub struct PurednsScanner {
    resolvers: ResolverList,
}

impl PurednsScanner {
    pub const TOOL: &'static str = "puredns";

    pub fn new(resolvers: ResolverList) -> Self {
        Self { resolvers }
    }
}

fn resolved_hosts(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn wildcard_notes(stderr: &str) -> impl Iterator<Item = &str> {
    stderr.lines().filter(|line| line.contains("wildcard"))
}

#[async_trait]
impl Scanner for PurednsScanner {
    fn name(&self) -> &str {
        "Puredns"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;
        let resolvers = self.resolvers.ensure().await?;

        let hosts = process::input_file(Self::TOOL, input)?;
        let written = tempfile::Builder::new()
            .prefix("trawl-puredns-out-")
            .suffix(".txt")
            .tempfile()?;

        let mut command = Command::new(&exe);
        command
            .arg("resolve")
            .arg(hosts.path())
            .arg("-r")
            .arg(resolvers)
            .arg("-w")
            .arg(written.path())
            .args(["--wildcard-batch", "1000000", "-q"]);

        let run = process::run(Self::TOOL, command, None).await?;
        run.tolerate_failure();
        for note in wildcard_notes(&run.stderr) {
            info!(scanner = self.name(), "{}", note.trim());
        }

        let content = tokio::fs::read_to_string(written.path()).await?;
        let resolved = resolved_hosts(&content);
        info!(
            scanner = self.name(),
            resolved = resolved.len(),
            filtered = input.len().saturating_sub(resolved.len()),
            "resolution finished"
        );

        Ok(resolved.into_iter().map(Finding::Domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_hosts_skips_blanks() {
        let hosts = resolved_hosts("a.example.com\n\n  b.example.com \n");
        assert_eq!(hosts, ["a.example.com", "b.example.com"]);
    }

    #[test]
    fn test_wildcard_notes() {
        let stderr = "Resolving domains\nFound 1 wildcard root: *.dev.example.com\nDone\n";
        let notes: Vec<_> = wildcard_notes(stderr).collect();
        assert_eq!(notes, ["Found 1 wildcard root: *.dev.example.com"]);
    }
}
