//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::storage::{Asset, Inventory, RunRecord, StorageStats};
use crate::types::Finding;
use chrono::{DateTime, Utc};
use console::{style, Style};
use std::fmt::Write as _;
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

/// How many new assets or ports the end-of-run summary lists.
const NEW_ITEMS_SHOWN: usize = 10;

/// Print a run report in human-readable plain text format.
pub fn print_run(record: &RunRecord) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    print_banner(&mut out, "Run Results")?;

    writeln!(out, "  {} {}", style("Targets:").bold(), record.target_label())?;
    writeln!(out, "  {} {}", style("Mode:").bold(), record.mode)?;
    writeln!(
        out,
        "  {} {}",
        style("Run ID:").bold(),
        style(record.id.short()).dim()
    )?;
    writeln!(
        out,
        "  {} {:.2}s",
        style("Duration:").bold(),
        record.duration_ms as f64 / 1000.0
    )?;
    writeln!(out)?;

    let summary = &record.summary;
    writeln!(
        out,
        "  {} {} discovered, {} resolved ({} filtered out)",
        style("Hosts:").bold(),
        style(summary.discovered).white().bold(),
        style(summary.resolved).green().bold(),
        style(summary.filtered_out).yellow()
    )?;
    writeln!(
        out,
        "  {} {} web services, {} open ports, {} fingerprinted, {} screenshots",
        style("Findings:").bold(),
        style(summary.web_services).green().bold(),
        style(summary.open_ports).green().bold(),
        summary.port_services,
        summary.screenshots
    )?;

    if !record.unavailable.is_empty() {
        writeln!(
            out,
            "  {} {}",
            style("Skipped:").bold(),
            style(record.unavailable.join(", ")).yellow()
        )?;
    }
    writeln!(out)?;

    let services: Vec<&Finding> = record
        .findings
        .iter()
        .filter(|f| !matches!(f, Finding::Domain(_)))
        .collect();

    if services.is_empty() {
        writeln!(out, "  {}", style("No services to display.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:<14}  {:<32}  {}",
            style("KIND").bold(),
            style("SUBJECT").bold(),
            style("DETAIL").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for finding in services {
            writeln!(
                out,
                "  {:<14}  {:<32}  {}",
                kind_style(finding).apply_to(finding.kind().to_string()),
                truncate_string(finding.subject(), 32),
                style(truncate_string(&finding_detail(finding), 40)).dim()
            )?;
        }

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print inventory counts before and after a run, plus what it added.
pub fn print_inventory_delta(
    before: (usize, usize),
    inventory: &Inventory,
    since: DateTime<Utc>,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let new_assets = inventory.assets_created_since(since);
    let new_ports = inventory.ports_created_since(since);

    writeln!(
        out,
        "  {} {} -> {} assets, {} -> {} ports",
        style("Inventory:").bold(),
        before.0,
        style(inventory.asset_count()).white().bold(),
        before.1,
        style(inventory.port_count()).white().bold()
    )?;

    if !new_assets.is_empty() {
        writeln!(
            out,
            "  {} {}",
            style("New assets:").bold(),
            style(new_assets.len()).green().bold()
        )?;
        for asset in new_assets.iter().take(NEW_ITEMS_SHOWN) {
            writeln!(out, "    {} {}", style("+").green(), asset.domain)?;
        }
        print_more(&mut out, new_assets.len())?;
    }

    if !new_ports.is_empty() {
        writeln!(
            out,
            "  {} {}",
            style("New ports:").bold(),
            style(new_ports.len()).green().bold()
        )?;
        for port in new_ports.iter().take(NEW_ITEMS_SHOWN) {
            writeln!(
                out,
                "    {} {}:{} {}",
                style("+").green(),
                port.host(),
                port.port,
                style(port.service_label()).dim()
            )?;
        }
        print_more(&mut out, new_ports.len())?;
    }

    writeln!(out)?;
    Ok(())
}

fn print_more(out: &mut impl Write, total: usize) -> io::Result<()> {
    if total > NEW_ITEMS_SHOWN {
        writeln!(
            out,
            "    {}",
            style(format!("... and {} more", total - NEW_ITEMS_SHOWN)).dim()
        )?;
    }
    Ok(())
}

/// Print the asset table.
pub fn print_assets(inventory: &Inventory) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if inventory.is_empty() {
        writeln!(out, "{}", style("No assets recorded yet.").dim())?;
        return Ok(());
    }

    print_banner(&mut out, "Assets")?;
    writeln!(
        out,
        "  {:<36}  {:<15}  {:>6}  {:>5}  {}",
        style("DOMAIN").bold(),
        style("IP").bold(),
        style("STATUS").bold(),
        style("PORTS").bold(),
        style("TITLE").bold()
    )?;
    writeln!(out, "  {}", style(THIN_RULE).dim())?;

    for asset in inventory.assets() {
        let status = if asset.status_code == 0 {
            "-".to_string()
        } else {
            asset.status_code.to_string()
        };
        let domain_style = if asset.is_live() {
            Style::new().green()
        } else {
            Style::new()
        };

        writeln!(
            out,
            "  {:<36}  {:<15}  {:>6}  {:>5}  {}",
            domain_style.apply_to(truncate_string(&asset.domain, 36)),
            asset.ip,
            status,
            asset.ports.len(),
            style(truncate_string(&asset.title, 30)).dim()
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "  {} assets, {} ports",
        style(inventory.asset_count()).white().bold(),
        style(inventory.port_count()).white().bold()
    )?;
    writeln!(out)?;
    Ok(())
}

/// Print everything known about one asset.
pub fn print_asset_detail(asset: &Asset) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    print_banner(&mut out, &asset.domain)?;
    let field = |label: &str, value: &str| -> String {
        let value = if value.is_empty() { "-" } else { value };
        format!("  {:<14} {}", style(label).bold(), value)
    };

    writeln!(out, "{}", field("URL:", &asset.url))?;
    writeln!(out, "{}", field("IP:", &asset.ip))?;
    let status = if asset.status_code == 0 {
        String::new()
    } else {
        asset.status_code.to_string()
    };
    writeln!(out, "{}", field("Status:", &status))?;
    writeln!(out, "{}", field("Title:", &asset.title))?;
    writeln!(out, "{}", field("Technologies:", &asset.technologies.join(", ")))?;
    writeln!(out, "{}", field("First seen:", &asset.created_at.to_rfc3339()))?;
    writeln!(out, "{}", field("Last seen:", &asset.last_seen.to_rfc3339()))?;
    writeln!(out)?;

    if asset.ports.is_empty() {
        writeln!(out, "  {}", style("No open ports recorded.").dim())?;
    } else {
        writeln!(
            out,
            "  {:>6}  {:<6}  {:<15}  {}",
            style("PORT").bold(),
            style("PROTO").bold(),
            style("IP").bold(),
            style("SERVICE").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        for port in &asset.ports {
            writeln!(
                out,
                "  {:>6}  {:<6}  {:<15}  {}",
                port.port,
                port.protocol,
                port.ip,
                port.service_label()
            )?;
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Print the run history list.
pub fn print_history(records: &[RunRecord], detailed: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if records.is_empty() {
        writeln!(out, "{}", style("No runs recorded yet.").dim())?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "{}", style("Run History").cyan().bold())?;
    writeln!(out, "{}", style(THIN_RULE).dim())?;

    for record in records {
        writeln!(
            out,
            "  {}  {}  {}",
            style(record.id.short()).dim(),
            record.started_at.format("%Y-%m-%d %H:%M"),
            record.summary_line()
        )?;
        if detailed {
            writeln!(out, "      targets: {}", record.targets.join(", "))?;
            if !record.unavailable.is_empty() {
                writeln!(
                    out,
                    "      skipped: {}",
                    style(record.unavailable.join(", ")).yellow()
                )?;
            }
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Print storage statistics under the history list.
pub fn print_storage_stats(stats: &StorageStats) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(
        out,
        "  {} {} runs, {:.1} KiB on disk",
        style("Storage:").bold(),
        stats.run_count,
        stats.total_size_bytes as f64 / 1024.0
    )?;
    if let (Some(oldest), Some(newest)) = (stats.oldest_run, stats.newest_run) {
        writeln!(
            out,
            "  {} {} .. {}",
            style("Range:").bold(),
            oldest.format("%Y-%m-%d"),
            newest.format("%Y-%m-%d")
        )?;
    }
    Ok(())
}

/// Print the header shown before a run starts.
pub fn print_run_header(targets: &[String], mode: &str, stages: &[&str]) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("trawl").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Mode: {}", style("•").dim(), style(mode).yellow());
    match targets {
        [only] => println!(
            "{} Target: {}",
            style("•").dim(),
            style(only).white().bold()
        ),
        many => println!(
            "{} Targets: {} domains",
            style("•").dim(),
            style(many.len()).white().bold()
        ),
    }
    println!("{} Stages: {}", style("•").dim(), stages.join(" -> "));
    println!();
}

/// Render a run report as uncolored text, for export files.
pub fn run_to_text(record: &RunRecord) -> String {
    let mut text = String::new();
    let summary = &record.summary;

    // Writing into a String cannot fail.
    let _ = writeln!(text, "Run Report: {}", record.id);
    let _ = writeln!(text, "{}\n", "=".repeat(60));
    let _ = writeln!(text, "Targets:      {}", record.targets.join(", "));
    let _ = writeln!(text, "Mode:         {}", record.mode);
    let _ = writeln!(text, "Started:      {}", record.started_at);
    let _ = writeln!(text, "Completed:    {}", record.completed_at);
    let _ = writeln!(text, "Duration:     {} ms\n", record.duration_ms);
    let _ = writeln!(
        text,
        "Summary: {} discovered, {} resolved, {} filtered out, {} web services, {} open ports, {} services, {} screenshots\n",
        summary.discovered,
        summary.resolved,
        summary.filtered_out,
        summary.web_services,
        summary.open_ports,
        summary.port_services,
        summary.screenshots
    );
    if !record.unavailable.is_empty() {
        let _ = writeln!(text, "Skipped:      {}\n", record.unavailable.join(", "));
    }

    if !record.findings.is_empty() {
        let _ = writeln!(text, "Findings:");
        let _ = writeln!(text, "{}", "-".repeat(60));
        let _ = writeln!(text, "{:<14}  {:<32}  {}", "KIND", "SUBJECT", "DETAIL");
        let _ = writeln!(text, "{}", "-".repeat(60));
        for finding in &record.findings {
            let _ = writeln!(
                text,
                "{:<14}  {:<32}  {}",
                finding.kind().to_string(),
                finding.subject(),
                finding_detail(finding)
            );
        }
    }

    text
}

/// The per-kind detail column.
pub(crate) fn finding_detail(finding: &Finding) -> String {
    match finding {
        Finding::Domain(_) => String::new(),
        Finding::WebService(web) => {
            let mut detail = format!("[{}]", web.status_code);
            if !web.title.is_empty() {
                detail.push(' ');
                detail.push_str(&web.title);
            }
            if !web.technologies.is_empty() {
                detail.push_str(&format!(" ({})", web.technologies.join(", ")));
            }
            detail
        }
        Finding::OpenPort(open) => format!("{}:{}", open.ip, open.port),
        Finding::PortService(svc) => {
            let mut detail = format!("{}/{} {}", svc.port, svc.protocol, svc.service);
            if !svc.version.is_empty() {
                detail.push(' ');
                detail.push_str(&svc.version);
            }
            detail
        }
        Finding::Screenshot(batch) => format!(
            "{} screenshots in {}",
            batch.screenshot_count,
            batch.screenshot_dir.display()
        ),
    }
}

fn kind_style(finding: &Finding) -> Style {
    match finding {
        Finding::WebService(_) => Style::new().green().bold(),
        Finding::OpenPort(_) => Style::new().yellow(),
        Finding::PortService(_) => Style::new().cyan(),
        Finding::Screenshot(_) => Style::new().magenta(),
        Finding::Domain(_) => Style::new(),
    }
}

fn print_banner(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                    {} {}",
        style("trawl").cyan().bold(),
        title
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
