//! Export subcommand implementation.
//!
//! Handles the `trawl export <run-id>` command for exporting saved runs.

use crate::cli::{Context, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::storage::RunStore;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Export a saved run.
#[derive(Parser, Debug)]
pub struct ExportCommand {
    /// Run ID or prefix to export
    ///
    /// Can be a full UUID or the first few characters (short ID).
    #[arg(value_name = "RUN_ID")]
    pub run_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Output file path (prints to stdout if not specified)
    #[arg(short = 'o', long = "output")]
    pub output_file: Option<PathBuf>,
}

impl ExportCommand {
    /// Execute the export command.
    pub fn execute(&self, ctx: &Context) -> CliResult<()> {
        let store = RunStore::open(ctx.paths.runs_dir())?;
        let record = store.find(&self.run_id)?;
        let content = output::render_run(&record, self.format)?;

        match &self.output_file {
            Some(path) => {
                fs::write(path, &content).map_err(|e| {
                    CliError::Other(format!("failed to write {}: {}", path.display(), e))
                })?;

                if !ctx.quiet {
                    output::print_success(&format!(
                        "Exported run {} to {}",
                        record.id.short(),
                        path.display()
                    ));
                }
            }
            None => println!("{}", content.trim_end()),
        }

        Ok(())
    }
}
