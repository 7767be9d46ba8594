//! History subcommand implementation.

use crate::cli::Context;
use crate::error::CliResult;
use crate::output;
use crate::storage::RunStore;
use clap::Parser;

/// View and manage run history.
#[derive(Parser, Debug)]
pub struct HistoryCommand {
    /// Number of recent runs to show
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Show targets and skipped tools for each run
    #[arg(short, long)]
    pub detailed: bool,

    /// Clear all run history
    #[arg(long)]
    pub clear: bool,

    /// Delete runs older than N days
    #[arg(long, value_name = "DAYS")]
    pub prune: Option<u32>,
}

impl HistoryCommand {
    /// Execute the history command.
    pub fn execute(&self, ctx: &Context) -> CliResult<()> {
        let store = RunStore::open(ctx.paths.runs_dir())?;

        if self.clear {
            let removed = store.clear()?;
            if !ctx.quiet {
                output::print_success(&format!("Removed {} runs", removed));
            }
            return Ok(());
        }

        if let Some(days) = self.prune {
            let removed = store.cleanup(chrono::Duration::days(i64::from(days)))?;
            if !ctx.quiet {
                output::print_success(&format!(
                    "Removed {} runs older than {} days",
                    removed, days
                ));
            }
            return Ok(());
        }

        let records = store.list_recent(self.count)?;
        output::print_history(&records, self.detailed || ctx.verbose)?;

        if !ctx.quiet && !records.is_empty() {
            output::print_storage_stats(&store.stats()?)?;
        }

        Ok(())
    }
}
