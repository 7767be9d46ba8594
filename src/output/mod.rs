//! Output formatting module.
//!
//! Renders run reports and the asset inventory as plain text, JSON, or CSV.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::{inventory_to_csv, run_to_csv};
pub use json_format::{print_json, to_json};
pub use plain::{
    print_asset_detail, print_assets, print_error, print_history, print_info,
    print_inventory_delta, print_run, print_run_header, print_storage_stats, print_success,
    print_warning, run_to_text,
};

use crate::cli::OutputFormat;
use crate::storage::{Inventory, RunRecord};
use std::io;

/// Print a run report in the requested format.
pub fn format_run(record: &RunRecord, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_run(record),
        OutputFormat::Json => print_json(record),
        OutputFormat::Csv => {
            print!("{}", run_to_csv(record)?);
            Ok(())
        }
    }
}

/// Render a run report to a string, for export.
pub fn render_run(record: &RunRecord, format: OutputFormat) -> io::Result<String> {
    match format {
        OutputFormat::Plain => Ok(run_to_text(record)),
        OutputFormat::Json => to_json(record),
        OutputFormat::Csv => run_to_csv(record),
    }
}

/// Print the inventory in the requested format.
pub fn format_inventory(inventory: &Inventory, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_assets(inventory),
        OutputFormat::Json => print_json(inventory),
        OutputFormat::Csv => {
            print!("{}", inventory_to_csv(inventory)?);
            Ok(())
        }
    }
}
