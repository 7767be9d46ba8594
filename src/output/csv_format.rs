//! CSV output formatting.

use super::plain::finding_detail;
use crate::storage::{Inventory, RunRecord};
use std::io;

fn csv_error(err: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> io::Result<String> {
    let bytes = wtr.into_inner().map_err(|e| csv_error(e.into_error()))?;
    String::from_utf8(bytes).map_err(csv_error)
}

/// One row per finding.
pub fn run_to_csv(record: &RunRecord) -> io::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["run_id", "kind", "subject", "detail"])
        .map_err(csv_error)?;

    let run_id = record.id.to_string();
    for finding in &record.findings {
        wtr.write_record([
            run_id.as_str(),
            &finding.kind().to_string(),
            finding.subject(),
            &finding_detail(finding),
        ])
        .map_err(csv_error)?;
    }

    finish(wtr)
}

/// One row per port, or one row per asset that has none.
pub fn inventory_to_csv(inventory: &Inventory) -> io::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "domain",
        "url",
        "ip",
        "status_code",
        "title",
        "technologies",
        "port",
        "protocol",
        "service",
        "version",
        "last_seen",
    ])
    .map_err(csv_error)?;

    for asset in inventory.assets() {
        let status = if asset.status_code == 0 {
            String::new()
        } else {
            asset.status_code.to_string()
        };
        let technologies = asset.technologies.join(";");
        let asset_fields = [
            asset.domain.as_str(),
            asset.url.as_str(),
            asset.ip.as_str(),
            status.as_str(),
            asset.title.as_str(),
            technologies.as_str(),
        ];

        if asset.ports.is_empty() {
            let last_seen = asset.last_seen.to_rfc3339();
            let mut row: Vec<&str> = asset_fields.to_vec();
            row.extend(["", "", "", "", last_seen.as_str()]);
            wtr.write_record(&row).map_err(csv_error)?;
            continue;
        }

        for port in &asset.ports {
            let number = port.port.to_string();
            let protocol = port.protocol.to_string();
            let last_seen = port.last_seen.to_rfc3339();
            let mut row: Vec<&str> = asset_fields.to_vec();
            row.extend([
                number.as_str(),
                protocol.as_str(),
                port.service.as_str(),
                port.version.as_str(),
                last_seen.as_str(),
            ]);
            wtr.write_record(&row).map_err(csv_error)?;
        }
    }

    finish(wtr)
}
