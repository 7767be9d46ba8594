//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `trawl scan -d <domain>` - Run the recon pipeline
//! - `trawl assets [domain]` - Browse the asset inventory
//! - `trawl screenshots list|serve` - Browse captured screenshots
//! - `trawl history` - View run history
//! - `trawl export <run-id>` - Export a run report

mod assets;
mod export;
mod history;
mod scan;
mod screenshots;

pub use assets::AssetsCommand;
pub use export::ExportCommand;
pub use history::HistoryCommand;
pub use scan::ScanCommand;
pub use screenshots::{ScreenshotsAction, ScreenshotsCommand};

use crate::config::{AppSettings, Paths};
use crate::error::CliResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// trawl - turn root domains into an inventory of assets and open services.
///
/// Chains subfinder-style discovery, DNS filtering, HTTP probing, port
/// scanning, service fingerprinting and screenshots. Every tool is optional;
/// a missing one is skipped with a warning.
#[derive(Parser, Debug)]
#[command(name = "trawl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A reconnaissance pipeline over external recon tools", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a settings file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the recon pipeline against root domains
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Show the asset inventory
    #[command(alias = "a")]
    Assets(AssetsCommand),

    /// List or serve captured screenshots
    Screenshots(ScreenshotsCommand),

    /// View run history
    #[command(alias = "h")]
    History(HistoryCommand),

    /// Export a saved run
    #[command(alias = "e")]
    Export(ExportCommand),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl OutputFormat {
    /// Parse the `default_output_format` setting, falling back to plain.
    pub fn from_setting(value: &str) -> Self {
        <Self as clap::ValueEnum>::from_str(value, true).unwrap_or_default()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// What every command handler gets: resolved paths, loaded settings and
/// the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: Paths,
    pub settings: AppSettings,
    pub verbose: bool,
    pub quiet: bool,
}

impl Context {
    /// Resolve directories and load settings, honoring `--config`.
    pub fn load(cli: &Cli) -> CliResult<Self> {
        let paths = Paths::resolve()?;
        let settings = match &cli.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load(&paths)?,
        };

        Ok(Self {
            paths,
            settings,
            verbose: cli.verbose,
            quiet: cli.quiet,
        })
    }

    /// The output format to use when a command was not given one.
    pub fn default_format(&self) -> OutputFormat {
        OutputFormat::from_setting(&self.settings.default_output_format)
    }
}

impl Cli {
    /// Dispatch to the selected subcommand.
    pub async fn run(&self) -> CliResult<()> {
        let ctx = Context::load(self)?;

        match &self.command {
            Commands::Scan(cmd) => cmd.execute(&ctx).await,
            Commands::Assets(cmd) => cmd.execute(&ctx),
            Commands::Screenshots(cmd) => cmd.execute(&ctx).await,
            Commands::History(cmd) => cmd.execute(&ctx),
            Commands::Export(cmd) => cmd.execute(&ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_format_from_setting() {
        assert_eq!(OutputFormat::from_setting("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_setting("CSV"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_setting("yaml"), OutputFormat::Plain);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["trawl", "history", "-n", "3", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::History(ref h) if h.count == 3));
    }
}
