//! What a successful pipeline execution hands back.

use crate::types::{Finding, OpenPort, PortService, ScreenshotBatch, WebService};
use serde::{Deserialize, Serialize};

/// Counts describing one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Tokens the execution started from.
    pub inputs: usize,
    /// Unique hosts after discovery.
    pub discovered: usize,
    /// Hosts that fed the probe and port-scan stage.
    pub resolved: usize,
    /// Hosts dropped by the DNS filter.
    pub filtered_out: usize,
    pub web_services: usize,
    pub open_ports: usize,
    pub port_services: usize,
    /// Screenshots captured across all root domains.
    pub screenshots: usize,
}

/// Findings plus bookkeeping for one execution.
///
/// Findings are ordered by stage: hosts, probe results, port-chain results
/// (sweep before fingerprint), screenshots, then trailing scanners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub findings: Vec<Finding>,
    pub summary: PipelineSummary,
    /// Scanners skipped because their executable was not installed.
    pub unavailable: Vec<String>,
}

impl PipelineReport {
    pub(crate) fn new(inputs: usize) -> Self {
        Self {
            summary: PipelineSummary {
                inputs,
                ..PipelineSummary::default()
            },
            ..Self::default()
        }
    }

    pub(crate) fn mark_unavailable(&mut self, scanner: &str) {
        if !self.unavailable.iter().any(|name| name == scanner) {
            self.unavailable.push(scanner.to_string());
        }
    }

    /// Recount the per-kind totals from the findings.
    pub(crate) fn tally(&mut self) {
        self.summary.web_services = self.web_services().count();
        self.summary.open_ports = self.open_ports().count();
        self.summary.port_services = self.port_services().count();
        self.summary.screenshots = self.screenshots().map(|b| b.screenshot_count).sum();
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.findings.iter().filter_map(|f| match f {
            Finding::Domain(host) => Some(host.as_str()),
            _ => None,
        })
    }

    pub fn web_services(&self) -> impl Iterator<Item = &WebService> {
        self.findings.iter().filter_map(|f| match f {
            Finding::WebService(web) => Some(web),
            _ => None,
        })
    }

    pub fn open_ports(&self) -> impl Iterator<Item = &OpenPort> {
        self.findings.iter().filter_map(|f| match f {
            Finding::OpenPort(open) => Some(open),
            _ => None,
        })
    }

    pub fn port_services(&self) -> impl Iterator<Item = &PortService> {
        self.findings.iter().filter_map(|f| match f {
            Finding::PortService(svc) => Some(svc),
            _ => None,
        })
    }

    pub fn screenshots(&self) -> impl Iterator<Item = &ScreenshotBatch> {
        self.findings.iter().filter_map(|f| match f {
            Finding::Screenshot(batch) => Some(batch),
            _ => None,
        })
    }
}
