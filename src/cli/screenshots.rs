//! Screenshots subcommand implementation.
//!
//! Lists the root domains that have a gowitness database and serves the
//! gowitness report viewer for one of them.

use crate::cli::Context;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::scanner::{list_screenshot_domains, serve_report};
use clap::{Parser, Subcommand};

/// List or serve captured screenshots.
#[derive(Parser, Debug)]
pub struct ScreenshotsCommand {
    #[command(subcommand)]
    pub action: ScreenshotsAction,
}

/// Screenshot actions.
#[derive(Subcommand, Debug)]
pub enum ScreenshotsAction {
    /// List root domains with screenshots
    List,

    /// Start the gowitness report server for one root domain
    Serve {
        /// Root domain whose screenshots to serve
        root: String,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "7171")]
        port: u16,
    },
}

impl ScreenshotsCommand {
    /// Execute the screenshots command.
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let base = ctx.settings.screenshot_dir(&ctx.paths);

        match &self.action {
            ScreenshotsAction::List => {
                let domains = list_screenshot_domains(&base)?;
                if domains.is_empty() {
                    if !ctx.quiet {
                        output::print_info(&format!("No screenshots in {}", base.display()));
                    }
                    return Ok(());
                }
                for domain in domains {
                    println!("{}", domain);
                }
                Ok(())
            }
            ScreenshotsAction::Serve { root, host, port } => {
                let known = list_screenshot_domains(&base)?;
                if !known.iter().any(|d| d == root) {
                    return Err(CliError::Other(format!(
                        "no screenshots for {} (try `trawl screenshots list`)",
                        root
                    )));
                }
                if !ctx.quiet {
                    output::print_info(&format!(
                        "Serving {} on http://{}:{} (Ctrl+C to stop)",
                        root, host, port
                    ));
                }
                serve_report(&base, root, host, *port).await?;
                Ok(())
            }
        }
    }
}
