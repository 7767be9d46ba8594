//! Subdog adapter.
//!
//! Subdog reads root domains on stdin and prints bare hostnames.

use crate::error::ScanResult;
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::Finding;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct SubdogScanner {
    batch: bool,
}

impl SubdogScanner {
    pub const TOOL: &'static str = "subdog";

    pub fn new(batch: bool) -> Self {
        Self { batch }
    }
}

#[async_trait]
impl Scanner for SubdogScanner {
    fn name(&self) -> &str {
        "Subdog"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;

        let feeds: Vec<Vec<String>> = if self.batch && input.len() > 1 {
            info!(scanner = self.name(), domains = input.len(), "batch enumeration");
            vec![input.to_vec()]
        } else {
            input.iter().map(|domain| vec![domain.clone()]).collect()
        };

        let mut seen = HashSet::new();
        let mut hosts = Vec::new();
        for feed in feeds {
            let mut command = Command::new(&exe);
            command.arg("--silent");

            let run = process::run(Self::TOOL, command, Some(feed)).await?;
            run.tolerate_failure();
            debug!(scanner = self.name(), lines = run.lines.len(), "run done");

            for line in run.lines {
                if seen.insert(line.clone()) {
                    hosts.push(line);
                }
            }
        }

        info!(scanner = self.name(), found = hosts.len(), "enumeration finished");
        Ok(hosts.into_iter().map(Finding::Domain).collect())
    }
}
