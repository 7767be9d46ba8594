//! Httpx adapter: HTTP liveness probing.
//!
//! Emits one [`Finding::WebService`] per responsive host with status code,
//! page title, detected technologies and resolved address.

use crate::error::ScanResult;
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::{Finding, WebService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::info;

/// The subset of an httpx JSON record that is kept.
#[derive(Debug, Deserialize)]
struct HttpxLine {
    url: String,
    #[serde(default)]
    status_code: u16,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tech: Vec<String>,
    #[serde(default)]
    host: String,
    #[serde(default)]
    input: String,
    #[serde(default)]
    host_ip: String,
    #[serde(default)]
    a: Vec<String>,
}

impl HttpxLine {
    fn into_web_service(self, discovered_at: DateTime<Utc>) -> WebService {
        let ip = if self.host_ip.is_empty() {
            self.a.into_iter().next().unwrap_or_default()
        } else {
            self.host_ip
        };
        let domain = if self.host.is_empty() {
            self.input
        } else {
            self.host
        };

        WebService {
            url: self.url,
            status_code: self.status_code,
            title: self.title,
            technologies: self.tech,
            ip,
            domain,
            discovered_at,
        }
    }
}

/// Httpx wrapper.
///
/// # Defaults
///
/// - 10 second request timeout
/// - 2 retries
#[derive(Debug, Clone)]
pub struct HttpxScanner {
    timeout_secs: u64,
    retries: u32,
}

impl Default for HttpxScanner {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retries: 2,
        }
    }
}

impl HttpxScanner {
    pub const TOOL: &'static str = "httpx";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

#[async_trait]
impl Scanner for HttpxScanner {
    fn name(&self) -> &str {
        "Httpx"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;
        info!(scanner = self.name(), hosts = input.len(), "probing");

        let list = process::input_file(Self::TOOL, input)?;
        let mut command = Command::new(&exe);
        command
            .arg("-l")
            .arg(list.path())
            .args(["-json", "-sc", "-title", "-td", "-ip", "-silent"])
            .arg("-timeout")
            .arg(self.timeout_secs.to_string())
            .arg("-retries")
            .arg(self.retries.to_string());

        let run = process::run(Self::TOOL, command, None).await?;
        // Unreachable hosts make httpx exit non-zero.
        run.tolerate_failure();

        let records: Vec<HttpxLine> = process::parse_json_lines(Self::TOOL, &run.lines)?;
        let now = Utc::now();
        let findings: Vec<Finding> = records
            .into_iter()
            .map(|record| Finding::WebService(record.into_web_service(now)))
            .collect();

        info!(scanner = self.name(), live = findings.len(), "probe finished");
        Ok(findings)
    }
}
