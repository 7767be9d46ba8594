//! Gowitness adapter: web screenshots, one database per root domain.
//!
//! Each root domain gets its own directory under the base directory holding
//! `gowitness.sqlite3` and a `screenshots/` folder, so reports can be served
//! per domain later.

use crate::error::{ScanError, ScanResult};
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::{group_by_root_domain, is_valid_hostname, Finding, RootDomainGroup, ScreenshotBatch};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Database file gowitness writes into its working directory.
pub const DATABASE_FILE: &str = "gowitness.sqlite3";

const SCREENSHOTS_DIR: &str = "screenshots";

/// Gowitness wrapper.
///
/// Input tokens are `url|root_domain`. A root domain whose run fails is
/// logged and skipped.
#[derive(Debug, Clone)]
pub struct GowitnessScanner {
    base_dir: PathBuf,
    threads: usize,
    status_filter: String,
}

impl GowitnessScanner {
    pub const TOOL: &'static str = "gowitness";

    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            threads: 10,
            status_filter: "200,403,401".to_string(),
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// HTTP status codes worth a screenshot, e.g. `200,403,401`.
    pub fn with_status_filter(mut self, filter: impl Into<String>) -> Self {
        self.status_filter = filter.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn capture(&self, exe: &Path, group: &RootDomainGroup) -> ScanResult<ScreenshotBatch> {
        let domain_dir = self.base_dir.join(&group.root_domain);
        tokio::fs::create_dir_all(&domain_dir).await?;

        let urls = process::input_file(Self::TOOL, &group.urls)?;
        let mut command = Command::new(exe);
        command
            .args(["scan", "file", "-f"])
            .arg(urls.path())
            .arg("--ports-small")
            .arg("--threads")
            .arg(self.threads.to_string())
            .args(["--write-db", "-q", "--http-code-filter"])
            .arg(&self.status_filter)
            .current_dir(&domain_dir);

        let run = process::run(Self::TOOL, command, None).await?;
        if !run.status.success() {
            warn!(
                scanner = self.name(),
                root_domain = %group.root_domain,
                status = %run.status,
                "gowitness reported errors, counting what was captured"
            );
        }

        let screenshot_dir = domain_dir.join(SCREENSHOTS_DIR);
        Ok(ScreenshotBatch {
            root_domain: group.root_domain.clone(),
            screenshot_count: count_files(&screenshot_dir),
            screenshot_dir,
            database_path: domain_dir.join(DATABASE_FILE),
        })
    }
}

#[async_trait]
impl Scanner for GowitnessScanner {
    fn name(&self) -> &str {
        "Gowitness"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;

        let mut findings = Vec::new();
        for group in group_by_root_domain(input) {
            if !is_valid_hostname(&group.root_domain) {
                warn!(root_domain = %group.root_domain, "refusing to use as a directory name");
                continue;
            }
            info!(
                scanner = self.name(),
                root_domain = %group.root_domain,
                urls = group.urls.len(),
                "capturing screenshots"
            );

            match self.capture(&exe, &group).await {
                Ok(batch) => {
                    info!(
                        scanner = self.name(),
                        root_domain = %batch.root_domain,
                        screenshots = batch.screenshot_count,
                        "capture finished"
                    );
                    findings.push(Finding::Screenshot(batch));
                }
                Err(e) if e.is_tool_not_found() => return Err(e),
                Err(e) => {
                    warn!(scanner = self.name(), root_domain = %group.root_domain, error = %e, "capture failed");
                }
            }
        }

        Ok(findings)
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

/// Root domains under `base_dir` that have a screenshot database, sorted.
pub fn list_screenshot_domains(base_dir: &Path) -> std::io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut domains = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() && entry.path().join(DATABASE_FILE).is_file() {
            domains.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    domains.sort();
    Ok(domains)
}

/// Run `gowitness report server` for one root domain until it exits.
pub async fn serve_report(base_dir: &Path, root_domain: &str, host: &str, port: u16) -> ScanResult<()> {
    let exe = process::locate(GowitnessScanner::TOOL)?;

    let domain_dir = base_dir.join(root_domain);
    if !domain_dir.join(DATABASE_FILE).is_file() {
        return Err(ScanError::DependencyMissing(format!(
            "no screenshot database for {} in {}",
            root_domain,
            domain_dir.display()
        )));
    }

    info!(root_domain, "serving screenshots on http://{}:{}", host, port);
    let mut command = Command::new(exe);
    command
        .args(["report", "server", "--host", host, "--port"])
        .arg(port.to_string())
        .current_dir(&domain_dir);

    process::interactive(GowitnessScanner::TOOL, command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_screenshot_domains() {
        let base = tempdir().unwrap();
        for domain in ["other.com", "example.com", "empty.com"] {
            std::fs::create_dir_all(base.path().join(domain)).unwrap();
        }
        std::fs::write(base.path().join("example.com").join(DATABASE_FILE), b"").unwrap();
        std::fs::write(base.path().join("other.com").join(DATABASE_FILE), b"").unwrap();
        std::fs::write(base.path().join("stray.txt"), b"").unwrap();

        let domains = list_screenshot_domains(base.path()).unwrap();
        assert_eq!(domains, ["example.com", "other.com"]);
    }

    #[test]
    fn test_list_missing_base_is_empty() {
        let base = tempdir().unwrap();
        let domains = list_screenshot_domains(&base.path().join("nope")).unwrap();
        assert!(domains.is_empty());
    }

    #[test]
    fn test_count_files_ignores_directories() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"").unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert_eq!(count_files(dir.path()), 2);
        assert_eq!(count_files(&dir.path().join("missing")), 0);
    }

    #[tokio::test]
    async fn test_empty_input_skips_tool() {
        let base = tempdir().unwrap();
        let scanner = GowitnessScanner::new(base.path());
        assert!(scanner.execute(&[]).await.unwrap().is_empty());
    }
}
