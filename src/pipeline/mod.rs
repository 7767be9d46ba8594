//! Pipeline orchestrator.
//!
//! Composes scanners into a fixed topology:
//!
//! ```text
//! discovery (parallel) -> resolution -> { probe | port-scan chain } -> screenshot -> trailing
//! ```
//!
//! Tokens flow between stages as plain strings; the orchestrator converts
//! findings into the next stage's tokens. A missing tool degrades its stage
//! with a warning, any other scanner error aborts the execution and nothing
//! computed so far is returned.

mod report;
mod stage;

pub use report::{PipelineReport, PipelineSummary};
pub use stage::Stage;

use crate::error::{PipelineError, PipelineResult};
use crate::scanner::{Scanner, SharedScanner};
use crate::types::{group_by_root_domain, Finding, ScreenshotToken};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A configured scanner topology.
///
/// Stages left unconfigured are skipped: no discovery scanners means the
/// input passes straight through, no resolver means no DNS filtering, and
/// so on.
///
/// # Example
///
/// ```ignore
/// use trawl::pipeline::Pipeline;
/// use trawl::scanner::{HttpxScanner, NaabuScanner, NmapScanner, SubfinderScanner};
///
/// let pipeline = Pipeline::new()
///     .add_discovery_scanner(SubfinderScanner::new(false))
///     .set_probe(HttpxScanner::new())
///     .add_port_scanner(NaabuScanner::new())
///     .add_port_scanner(NmapScanner::new());
///
/// let report = pipeline.execute(&["example.com".to_string()]).await?;
/// ```
#[derive(Default, Clone)]
pub struct Pipeline {
    discovery: Vec<SharedScanner>,
    resolver: Option<SharedScanner>,
    probe: Option<SharedScanner>,
    port_chain: Vec<SharedScanner>,
    screenshot: Option<SharedScanner>,
    trailing: Vec<SharedScanner>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scanner to the parallel discovery group.
    pub fn add_discovery_scanner(self, scanner: impl Scanner + 'static) -> Self {
        self.add_discovery_scanner_shared(Arc::new(scanner))
    }

    pub fn add_discovery_scanner_shared(mut self, scanner: SharedScanner) -> Self {
        self.discovery.push(scanner);
        self
    }

    /// Set the DNS resolution/wildcard filter.
    pub fn set_resolver(self, scanner: impl Scanner + 'static) -> Self {
        self.set_resolver_shared(Arc::new(scanner))
    }

    pub fn set_resolver_shared(mut self, scanner: SharedScanner) -> Self {
        self.resolver = Some(scanner);
        self
    }

    /// Set the HTTP liveness prober.
    pub fn set_probe(self, scanner: impl Scanner + 'static) -> Self {
        self.set_probe_shared(Arc::new(scanner))
    }

    pub fn set_probe_shared(mut self, scanner: SharedScanner) -> Self {
        self.probe = Some(scanner);
        self
    }

    /// Append a scanner to the port-scan chain. Chain members run in the
    /// order they were added.
    pub fn add_port_scanner(self, scanner: impl Scanner + 'static) -> Self {
        self.add_port_scanner_shared(Arc::new(scanner))
    }

    pub fn add_port_scanner_shared(mut self, scanner: SharedScanner) -> Self {
        self.port_chain.push(scanner);
        self
    }

    pub fn set_screenshot_scanner(self, scanner: impl Scanner + 'static) -> Self {
        self.set_screenshot_scanner_shared(Arc::new(scanner))
    }

    pub fn set_screenshot_scanner_shared(mut self, scanner: SharedScanner) -> Self {
        self.screenshot = Some(scanner);
        self
    }

    /// Append a trailing serial scanner.
    pub fn add_scanner(self, scanner: impl Scanner + 'static) -> Self {
        self.add_scanner_shared(Arc::new(scanner))
    }

    pub fn add_scanner_shared(mut self, scanner: SharedScanner) -> Self {
        self.trailing.push(scanner);
        self
    }

    /// Run the full topology starting from root domains.
    pub async fn execute(&self, input: &[String]) -> PipelineResult<PipelineReport> {
        let mut report = PipelineReport::new(input.len());
        info!(inputs = input.len(), "pipeline started");

        let discovered = self.discover(input, &mut report).await?;
        report.summary.discovered = discovered.len();

        let hosts = self.resolve(discovered, &mut report).await?;
        report.summary.resolved = hosts.len();
        report
            .findings
            .extend(hosts.iter().cloned().map(Finding::Domain));

        self.run_from_hosts(&hosts, report).await
    }

    /// Skip discovery and resolution, treating `subdomains` as live hosts.
    pub async fn execute_from_subdomains(
        &self,
        subdomains: &[String],
    ) -> PipelineResult<PipelineReport> {
        let mut report = PipelineReport::new(subdomains.len());
        info!(hosts = subdomains.len(), "pipeline started from known subdomains");

        let hosts = dedup(subdomains.iter().cloned());
        report.summary.discovered = hosts.len();
        report.summary.resolved = hosts.len();

        self.run_from_hosts(&hosts, report).await
    }

    async fn run_from_hosts(
        &self,
        hosts: &[String],
        mut report: PipelineReport,
    ) -> PipelineResult<PipelineReport> {
        self.probe_and_scan(hosts, &mut report).await?;
        self.capture_screenshots(&mut report).await;
        self.run_trailing(hosts, &mut report).await?;

        report.tally();
        info!(
            hosts = report.summary.resolved,
            web_services = report.summary.web_services,
            open_ports = report.summary.open_ports,
            port_services = report.summary.port_services,
            screenshots = report.summary.screenshots,
            "pipeline finished"
        );
        Ok(report)
    }

    async fn discover(
        &self,
        input: &[String],
        report: &mut PipelineReport,
    ) -> PipelineResult<Vec<String>> {
        if self.discovery.is_empty() {
            return Ok(input.to_vec());
        }

        let outcomes =
            stage::fan_out(Stage::Discovery, &self.discovery, Arc::from(input)).await?;

        let mut seen = HashSet::new();
        let mut hosts = Vec::new();
        for outcome in outcomes {
            let findings = match outcome.result {
                Ok(findings) => findings,
                Err(e) if e.is_tool_not_found() => {
                    warn!(stage = %Stage::Discovery, scanner = %outcome.scanner, error = %e, "scanner unavailable, skipping");
                    report.mark_unavailable(&outcome.scanner);
                    continue;
                }
                Err(e) => return Err(PipelineError::scanner(Stage::Discovery, outcome.scanner, e)),
            };

            let before = hosts.len();
            for finding in findings {
                match finding {
                    Finding::Domain(host) if !host.is_empty() => {
                        if seen.insert(host.clone()) {
                            hosts.push(host);
                        }
                    }
                    other => debug!(scanner = %outcome.scanner, kind = %other.kind(), "dropping non-domain discovery finding"),
                }
            }
            info!(stage = %Stage::Discovery, scanner = %outcome.scanner, new = hosts.len() - before, "merged");
        }

        info!(stage = %Stage::Discovery, hosts = hosts.len(), "discovery finished");
        Ok(hosts)
    }

    async fn resolve(
        &self,
        hosts: Vec<String>,
        report: &mut PipelineReport,
    ) -> PipelineResult<Vec<String>> {
        let Some(resolver) = &self.resolver else {
            return Ok(hosts);
        };

        let findings = match resolver.execute(&hosts).await {
            Ok(findings) => findings,
            Err(e) if e.is_tool_not_found() => {
                warn!(stage = %Stage::Resolution, scanner = resolver.name(), error = %e, "resolver unavailable, keeping unfiltered hosts");
                report.mark_unavailable(resolver.name());
                return Ok(hosts);
            }
            Err(e) => return Err(PipelineError::scanner(Stage::Resolution, resolver.name(), e)),
        };

        let candidates: HashSet<&str> = hosts.iter().map(String::as_str).collect();
        let resolved = dedup(findings.into_iter().filter_map(|finding| match finding {
            Finding::Domain(host) if candidates.contains(host.as_str()) => Some(host),
            Finding::Domain(host) => {
                debug!(host = %host, "resolver returned a host that was not asked for");
                None
            }
            _ => None,
        }));

        report.summary.filtered_out = hosts.len() - resolved.len();
        info!(
            stage = %Stage::Resolution,
            resolved = resolved.len(),
            filtered_out = report.summary.filtered_out,
            "resolution finished"
        );
        Ok(resolved)
    }

    /// Probe and port-scan chain run side by side over the same hosts.
    async fn probe_and_scan(
        &self,
        hosts: &[String],
        report: &mut PipelineReport,
    ) -> PipelineResult<()> {
        if self.probe.is_none() && self.port_chain.is_empty() {
            return Ok(());
        }
        let input: Arc<[String]> = Arc::from(hosts);

        let probe_task = self.probe.as_ref().map(|probe| {
            let name = probe.name().to_string();
            let probe = Arc::clone(probe);
            let input = Arc::clone(&input);
            (name, tokio::spawn(async move { probe.execute(&input).await }))
        });

        let chain_task = (!self.port_chain.is_empty()).then(|| {
            let chain = self.port_chain.clone();
            let input = Arc::clone(&input);
            tokio::spawn(run_port_chain(chain, input))
        });

        // Both branches finish before either outcome is looked at.
        let probe_joined = match probe_task {
            Some((name, handle)) => Some((name, handle.await)),
            None => None,
        };
        let chain_joined = match chain_task {
            Some(handle) => Some(handle.await),
            None => None,
        };

        let mut probe_findings = Vec::new();
        if let Some((name, joined)) = probe_joined {
            match joined {
                Ok(Ok(findings)) => {
                    info!(stage = %Stage::Probe, scanner = %name, findings = findings.len(), "probe finished");
                    probe_findings = findings;
                }
                Ok(Err(e)) if e.is_tool_not_found() => {
                    warn!(stage = %Stage::Probe, scanner = %name, error = %e, "prober unavailable, skipping");
                    report.mark_unavailable(&name);
                }
                Ok(Err(e)) => return Err(PipelineError::scanner(Stage::Probe, name, e)),
                Err(_) => {
                    return Err(PipelineError::WorkerPanicked {
                        stage: Stage::Probe,
                        scanner: name,
                    })
                }
            }
        }

        let mut chain_findings = Vec::new();
        if let Some(joined) = chain_joined {
            let outcome = joined.map_err(|_| PipelineError::WorkerPanicked {
                stage: Stage::PortScan,
                scanner: chain_label(&self.port_chain),
            })??;
            for name in &outcome.unavailable {
                report.mark_unavailable(name);
            }
            chain_findings = outcome.findings;
        }

        report.findings.extend(probe_findings);
        report.findings.extend(chain_findings);
        Ok(())
    }

    /// One screenshot run per root domain; a failing domain is skipped.
    async fn capture_screenshots(&self, report: &mut PipelineReport) {
        let Some(scanner) = &self.screenshot else {
            return;
        };

        let tokens: Vec<String> = report
            .web_services()
            .map(|web| ScreenshotToken::from_web_service(web).to_string())
            .collect();
        let groups = group_by_root_domain(&tokens);
        info!(stage = %Stage::Screenshot, root_domains = groups.len(), urls = tokens.len(), "capturing screenshots");

        let mut batches = Vec::new();
        for group in groups {
            match scanner.execute(&group.tokens()).await {
                Ok(findings) => batches.extend(findings),
                Err(e) if e.is_tool_not_found() => {
                    warn!(stage = %Stage::Screenshot, scanner = scanner.name(), error = %e, "screenshot tool unavailable, skipping");
                    report.mark_unavailable(scanner.name());
                    break;
                }
                Err(e) => {
                    warn!(
                        stage = %Stage::Screenshot,
                        scanner = scanner.name(),
                        root_domain = %group.root_domain,
                        error = %e,
                        "screenshots failed for root domain"
                    );
                }
            }
        }

        report.findings.extend(batches);
    }

    /// Trailing scanners run in sequence. The first receives the hosts that
    /// fed the probe stage; each later one receives the string tokens of
    /// its predecessor's findings.
    async fn run_trailing(
        &self,
        hosts: &[String],
        report: &mut PipelineReport,
    ) -> PipelineResult<()> {
        let mut tokens = hosts.to_vec();

        for scanner in &self.trailing {
            match scanner.execute(&tokens).await {
                Ok(findings) => {
                    info!(stage = %Stage::Trailing, scanner = scanner.name(), findings = findings.len(), "scanner finished");
                    tokens = findings.iter().filter_map(Finding::as_token).collect();
                    report.findings.extend(findings);
                }
                Err(e) if e.is_tool_not_found() => {
                    warn!(stage = %Stage::Trailing, scanner = scanner.name(), error = %e, "scanner unavailable, passing tokens through");
                    report.mark_unavailable(scanner.name());
                }
                Err(e) => return Err(PipelineError::scanner(Stage::Trailing, scanner.name(), e)),
            }
        }

        Ok(())
    }
}

/// Result of the port-scan branch.
#[derive(Debug, Default)]
struct ChainOutcome {
    findings: Vec<Finding>,
    unavailable: Vec<String>,
}

/// Run chain members in order, feeding each the `ip:port[:host]` tokens of
/// the previous member's findings.
///
/// A missing member stops the chain and keeps what earlier members found.
async fn run_port_chain(
    chain: Vec<SharedScanner>,
    input: Arc<[String]>,
) -> PipelineResult<ChainOutcome> {
    let mut outcome = ChainOutcome::default();
    let mut tokens: Vec<String> = input.to_vec();

    for scanner in &chain {
        if tokens.is_empty() {
            debug!(stage = %Stage::PortScan, scanner = scanner.name(), "no tokens left, chain stops");
            break;
        }

        match scanner.execute(&tokens).await {
            Ok(findings) => {
                info!(stage = %Stage::PortScan, scanner = scanner.name(), findings = findings.len(), "chain member finished");
                tokens = findings.iter().filter_map(Finding::port_token).collect();
                outcome.findings.extend(findings);
            }
            Err(e) if e.is_tool_not_found() => {
                warn!(stage = %Stage::PortScan, scanner = scanner.name(), error = %e, "chain member unavailable, stopping chain");
                outcome.unavailable.push(scanner.name().to_string());
                break;
            }
            Err(e) => return Err(PipelineError::scanner(Stage::PortScan, scanner.name(), e)),
        }
    }

    Ok(outcome)
}

fn chain_label(chain: &[SharedScanner]) -> String {
    chain
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Drop repeats, keeping first occurrences in order.
fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let items = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedup(items), ["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_echoes_hosts() {
        let input = vec!["example.com".to_string()];
        let report = Pipeline::new().execute(&input).await.unwrap();
        assert_eq!(report.findings, vec![Finding::domain("example.com")]);
        assert_eq!(report.summary.discovered, 1);
        assert_eq!(report.summary.resolved, 1);
        assert!(report.unavailable.is_empty());
    }
}
