//! Naabu adapter: fast open-port sweep.

use crate::error::ScanResult;
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::{Finding, OpenPort, Port, PortSpec};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct NaabuLine {
    #[serde(default)]
    host: String,
    #[serde(default)]
    ip: String,
    port: u32,
}

impl NaabuLine {
    fn into_open_port(self) -> Option<OpenPort> {
        match Port::try_from(self.port) {
            Ok(port) => Some(OpenPort {
                host: self.host,
                ip: self.ip,
                port,
            }),
            Err(e) => {
                debug!(error = %e, "dropping naabu record");
                None
            }
        }
    }
}

/// Naabu wrapper.
///
/// Sweeps the top N ports of every input host. Web ports are excluded by
/// default since the prober already covers them.
#[derive(Debug, Clone)]
pub struct NaabuScanner {
    top_ports: String,
    exclude: PortSpec,
}

impl Default for NaabuScanner {
    fn default() -> Self {
        let mut exclude = PortSpec::new();
        for port in [80, 443] {
            if let Some(port) = Port::new(port) {
                exclude.add_port(port);
            }
        }
        Self {
            top_ports: "1000".to_string(),
            exclude,
        }
    }
}

impl NaabuScanner {
    pub const TOOL: &'static str = "naabu";

    pub fn new() -> Self {
        Self::default()
    }

    /// `-top-ports` value: `100`, `1000` or `full`.
    pub fn with_top_ports(mut self, top_ports: impl Into<String>) -> Self {
        self.top_ports = top_ports.into();
        self
    }

    pub fn with_excluded(mut self, exclude: PortSpec) -> Self {
        self.exclude = exclude;
        self
    }

    fn command(&self, exe: &std::path::Path, list: &std::path::Path) -> Command {
        let mut command = Command::new(exe);
        command
            .arg("-list")
            .arg(list)
            .arg("-top-ports")
            .arg(&self.top_ports);
        if !self.exclude.is_empty() {
            command.arg("-exclude-ports").arg(self.exclude.to_string());
        }
        command.args(["-json", "-silent"]);
        command
    }
}

#[async_trait]
impl Scanner for NaabuScanner {
    fn name(&self) -> &str {
        "Naabu"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;
        info!(
            scanner = self.name(),
            hosts = input.len(),
            top_ports = %self.top_ports,
            exclude = %self.exclude,
            "sweeping ports"
        );

        let list = process::input_file(Self::TOOL, input)?;
        let run = process::run(Self::TOOL, self.command(&exe, list.path()), None).await?;
        run.tolerate_failure();

        let records: Vec<NaabuLine> = process::parse_json_lines(Self::TOOL, &run.lines)?;
        let findings: Vec<Finding> = records
            .into_iter()
            .filter_map(NaabuLine::into_open_port)
            .map(Finding::OpenPort)
            .collect();

        info!(scanner = self.name(), open = findings.len(), "sweep finished");
        Ok(findings)
    }
}
