//! trawl - a reconnaissance pipeline over external recon tools.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use trawl::cli::Cli;
use trawl::output;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    cli.run().await?;
    Ok(())
}

/// Logs go to stderr so reports on stdout stay parseable.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "trawl=debug"
    } else if quiet {
        "trawl=warn"
    } else {
        "trawl=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
