//! Scan subcommand implementation.
//!
//! Handles the `trawl scan` command: builds the scanner topology from the
//! flags and settings, runs it, and merges the findings into the inventory.

use crate::cli::{Context, OutputFormat};
use crate::error::{CliError, CliResult, StorageError};
use crate::output;
use crate::pipeline::{Pipeline, PipelineReport};
use crate::scanner::{
    GowitnessScanner, HttpxScanner, NaabuScanner, NmapScanner, PurednsScanner,
    SamoscoutScanner, ShosubgoScanner, SubdogScanner, SubfinderScanner,
};
use crate::storage::{AssetStore, Inventory, RunMode, RunRecord, RunStore};
use crate::types::{Finding, TargetList};
use chrono::Utc;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Run the recon pipeline.
#[derive(Parser, Debug)]
#[command(group(clap::ArgGroup::new("input").required(true).args(["domain", "list"])))]
pub struct ScanCommand {
    /// Root domain to scan
    #[arg(short, long, value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// File with one domain per line (blank lines and # comments ignored)
    #[arg(short, long, value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Only enumerate and resolve subdomains
    #[arg(long, conflicts_with = "from_subdomains")]
    pub subs_only: bool,

    /// Treat the input as already-known live subdomains
    #[arg(long)]
    pub from_subdomains: bool,

    /// Skip the DNS resolution filter
    #[arg(long)]
    pub no_resolve: bool,

    /// Capture screenshots of live web services
    #[arg(long, conflicts_with = "subs_only")]
    pub screenshots: bool,

    /// Hand all domains to each discovery tool at once (default with --list)
    #[arg(long)]
    pub batch: bool,

    /// Run discovery tools once per domain even with --list
    #[arg(long, conflicts_with = "batch")]
    pub no_batch: bool,

    /// Shodan API key for Shosubgo
    #[arg(long, env = "SHODAN_API_KEY", hide_env_values = true)]
    pub shodan_key: Option<String>,

    /// Don't save a run record
    #[arg(long)]
    pub no_save: bool,

    /// Output format for the report
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let targets = self.targets()?;
        let mode = self.mode();
        let format = self.output.unwrap_or_else(|| ctx.default_format());
        let pipeline = self.build_pipeline(ctx, targets.len())?;

        if !ctx.quiet && format == OutputFormat::Plain {
            output::print_run_header(targets.domains(), &mode.to_string(), &self.stage_names());
        }

        let record = RunRecord::new(targets.domains().to_vec(), mode);
        let tokens = targets.into_tokens();
        let report = match mode {
            RunMode::FromSubdomains => pipeline.execute_from_subdomains(&tokens).await?,
            RunMode::Full | RunMode::SubdomainsOnly => pipeline.execute(&tokens).await?,
        };

        for scanner in &report.unavailable {
            output::print_warning(&format!("{} is not installed; its stage was skipped", scanner));
        }

        // Persist only once the execution has succeeded.
        let asset_store = AssetStore::open(&ctx.paths.data_dir)?;
        let mut inventory = asset_store.load()?;
        let before = (inventory.asset_count(), inventory.port_count());
        let since = Utc::now();
        let stored = persist_findings(&mut inventory, &report, mode)?;
        asset_store.save(&inventory)?;
        debug!(stored, "inventory updated");

        let record = record.finalize(report);
        if !self.no_save && ctx.settings.auto_save_runs {
            let store = RunStore::open(ctx.paths.runs_dir())?;
            store.save(&record)?;
            info!(run = %record.id, "run saved");

            if !ctx.quiet && format == OutputFormat::Plain {
                output::print_info(&format!("Run saved as {}", record.id.short()));
            }
        }

        output::format_run(&record, format)?;
        if format == OutputFormat::Plain && !ctx.quiet {
            output::print_inventory_delta(before, &inventory, since)?;
        }

        Ok(())
    }

    fn targets(&self) -> CliResult<TargetList> {
        match (&self.domain, &self.list) {
            (Some(domain), _) => Ok(TargetList::single(domain)?),
            (None, Some(path)) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    CliError::Other(format!("failed to read {}: {}", path.display(), e))
                })?;
                Ok(TargetList::parse(&content)?)
            }
            (None, None) => Err(CliError::Other(
                "either --domain or --list is required".to_string(),
            )),
        }
    }

    fn mode(&self) -> RunMode {
        if self.from_subdomains {
            RunMode::FromSubdomains
        } else if self.subs_only {
            RunMode::SubdomainsOnly
        } else {
            RunMode::Full
        }
    }

    fn batch(&self, target_count: usize) -> bool {
        if self.no_batch {
            return false;
        }
        (self.batch || self.list.is_some()) && target_count > 1
    }

    /// Assemble the topology the flags ask for.
    fn build_pipeline(&self, ctx: &Context, target_count: usize) -> CliResult<Pipeline> {
        let settings = &ctx.settings;
        let mut pipeline = Pipeline::new();

        if !self.from_subdomains {
            let batch = self.batch(target_count);
            pipeline = pipeline
                .add_discovery_scanner(SubfinderScanner::new(batch))
                .add_discovery_scanner(SamoscoutScanner::new(batch))
                .add_discovery_scanner(SubdogScanner::new(batch));

            match settings.shodan_key(self.shodan_key.clone()) {
                Some(key) => {
                    pipeline = pipeline.add_discovery_scanner(ShosubgoScanner::new(Some(key)));
                }
                None => debug!("no Shodan API key, Shosubgo disabled"),
            }

            if !self.no_resolve {
                pipeline =
                    pipeline.set_resolver(PurednsScanner::new(settings.resolver_list(&ctx.paths)));
            }
        }

        if self.subs_only {
            return Ok(pipeline);
        }

        pipeline = pipeline
            .set_probe(
                HttpxScanner::new()
                    .with_timeout(settings.httpx_timeout_secs)
                    .with_retries(settings.httpx_retries),
            )
            .add_port_scanner(
                NaabuScanner::new()
                    .with_top_ports(settings.naabu_top_ports.clone())
                    .with_excluded(settings.naabu_exclude()?),
            )
            .add_port_scanner(NmapScanner::new());

        if self.screenshots {
            pipeline = pipeline.set_screenshot_scanner(
                GowitnessScanner::new(settings.screenshot_dir(&ctx.paths))
                    .with_threads(settings.gowitness_threads)
                    .with_status_filter(settings.gowitness_status_filter.clone()),
            );
        }

        Ok(pipeline)
    }

    fn stage_names(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if !self.from_subdomains {
            stages.push("discovery");
            if !self.no_resolve {
                stages.push("resolution");
            }
        }
        if !self.subs_only {
            stages.push("probe + port-scan");
            if self.screenshots {
                stages.push("screenshot");
            }
        }
        stages
    }
}

/// Merge a report into the inventory. Subdomain-only runs record bare hosts;
/// other runs record what the probe and port chain found. A finding with no
/// usable key is logged and skipped.
fn persist_findings(
    inventory: &mut Inventory,
    report: &PipelineReport,
    mode: RunMode,
) -> CliResult<usize> {
    let mut stored = 0;

    for finding in &report.findings {
        let wanted = match (mode, finding) {
            (RunMode::SubdomainsOnly, Finding::Domain(_)) => true,
            (RunMode::SubdomainsOnly, _) => false,
            (_, Finding::Domain(_)) => false,
            _ => true,
        };
        if !wanted {
            continue;
        }
        match inventory.apply(finding) {
            Ok(Some(_)) => stored += 1,
            Ok(None) => {}
            Err(e @ StorageError::MissingKey { .. }) => {
                warn!(kind = %finding.kind(), subject = finding.subject(), error = %e, "skipping finding");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(stored)
}
