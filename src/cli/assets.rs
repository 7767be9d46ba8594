//! Assets subcommand implementation.
//!
//! Handles `trawl assets [DOMAIN]`: the full inventory table, or everything
//! known about one host.

use crate::cli::{Context, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::storage::AssetStore;
use clap::Parser;

/// Show the asset inventory.
#[derive(Parser, Debug)]
pub struct AssetsCommand {
    /// Show details for one domain
    #[arg(value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

impl AssetsCommand {
    /// Execute the assets command.
    pub fn execute(&self, ctx: &Context) -> CliResult<()> {
        let store = AssetStore::open(&ctx.paths.data_dir)?;
        let inventory = store.load()?;
        let format = self.output.unwrap_or_else(|| ctx.default_format());

        let Some(domain) = &self.domain else {
            output::format_inventory(&inventory, format)?;
            return Ok(());
        };

        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let asset = inventory
            .asset(&domain)
            .ok_or_else(|| CliError::Other(format!("no asset recorded for {}", domain)))?;

        match format {
            OutputFormat::Plain => output::print_asset_detail(asset)?,
            OutputFormat::Json => output::print_json(asset)?,
            OutputFormat::Csv => {
                return Err(CliError::Other(
                    "CSV output is only available for the full inventory".to_string(),
                ))
            }
        }

        Ok(())
    }
}
