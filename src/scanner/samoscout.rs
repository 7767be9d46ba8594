//! Samoscout adapter.

use crate::error::ScanResult;
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::Finding;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SamoscoutLine {
    host: String,
}

/// Samoscout wrapper.
///
/// Samoscout interleaves progress text with its JSON records, so only lines
/// that open a JSON object are parsed. Hosts are de-duplicated per call and
/// a non-zero exit keeps whatever was printed.
#[derive(Debug, Clone, Default)]
pub struct SamoscoutScanner {
    batch: bool,
}

impl SamoscoutScanner {
    pub const TOOL: &'static str = "samoscout";

    pub fn new(batch: bool) -> Self {
        Self { batch }
    }
}

fn json_records(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| line.starts_with('{'))
        .cloned()
        .collect()
}

#[async_trait]
impl Scanner for SamoscoutScanner {
    fn name(&self) -> &str {
        "Samoscout"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;

        let list = if self.batch && input.len() > 1 {
            info!(scanner = self.name(), domains = input.len(), "batch enumeration");
            Some(process::input_file(Self::TOOL, input)?)
        } else {
            None
        };

        let runs: Vec<Command> = match &list {
            Some(list) => {
                let mut command = Command::new(&exe);
                command.arg("-dL").arg(list.path()).args(["-silent", "-json"]);
                vec![command]
            }
            None => input
                .iter()
                .map(|domain| {
                    let mut command = Command::new(&exe);
                    command.arg("-d").arg(domain).args(["-silent", "-json"]);
                    command
                })
                .collect(),
        };

        let mut seen = HashSet::new();
        let mut hosts = Vec::new();
        for command in runs {
            let run = process::run(Self::TOOL, command, None).await?;
            run.tolerate_failure();

            let records: Vec<SamoscoutLine> =
                process::parse_json_lines(Self::TOOL, &json_records(&run.lines))?;
            debug!(scanner = self.name(), records = records.len(), "run done");

            for record in records {
                if !record.host.is_empty() && seen.insert(record.host.clone()) {
                    hosts.push(record.host);
                }
            }
        }

        info!(scanner = self.name(), found = hosts.len(), "enumeration finished");
        Ok(hosts.into_iter().map(Finding::Domain).collect())
    }
}
