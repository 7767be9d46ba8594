//! JSON-file persistence for the inventory and run history.
//!
//! The inventory lives in a single `inventory.json` that is replaced
//! atomically on save. Each pipeline run is stored as its own
//! `runs/<id>.json` for simplicity and durability.

use crate::error::{StorageError, StorageResult};
use crate::pipeline::{PipelineReport, PipelineSummary};
use crate::storage::inventory::Inventory;
use crate::types::{Finding, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Which entry point and stage selection a run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Discovery through screenshots.
    Full,
    /// Discovery and DNS filtering only.
    SubdomainsOnly,
    /// Started from a caller-supplied subdomain list.
    FromSubdomains,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::SubdomainsOnly => write!(f, "subdomains-only"),
            Self::FromSubdomains => write!(f, "from-subdomains"),
        }
    }
}

/// A persisted pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier for this run.
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Root domains or subdomains the run started from.
    pub targets: Vec<String>,
    pub mode: RunMode,
    pub summary: PipelineSummary,
    /// Scanners that were skipped because they are not installed.
    #[serde(default)]
    pub unavailable: Vec<String>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    pub findings: Vec<Finding>,
}

impl RunRecord {
    /// Start a record for a run beginning now.
    pub fn new(targets: Vec<String>, mode: RunMode) -> Self {
        let now = Utc::now();
        Self {
            id: RunId::new(),
            started_at: now,
            completed_at: now,
            targets,
            mode,
            summary: PipelineSummary::default(),
            unavailable: Vec::new(),
            duration_ms: 0,
            findings: Vec::new(),
        }
    }

    /// Fill in the outcome of a successful execution.
    pub fn finalize(mut self, report: PipelineReport) -> Self {
        self.completed_at = Utc::now();
        self.duration_ms = (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.summary = report.summary;
        self.unavailable = report.unavailable;
        self.findings = report.findings;
        self
    }

    /// The targets as one label: the domain itself, or a count.
    pub fn target_label(&self) -> String {
        match self.targets.as_slice() {
            [only] => only.clone(),
            many => format!("{} domains", many.len()),
        }
    }

    /// One-line description for history listings.
    pub fn summary_line(&self) -> String {
        format!(
            "{} [{}] - {} hosts, {} web, {} ports, {} services [{:.1}s]",
            self.target_label(),
            self.mode,
            self.summary.resolved,
            self.summary.web_services,
            self.summary.open_ports,
            self.summary.port_services,
            self.duration_ms as f64 / 1000.0
        )
    }
}

/// Write `content` next to `path` and rename it into place.
fn write_atomic(path: &Path, content: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::SaveFailed(format!("{} has no parent", path.display())))?;
    let mut staged =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::SaveFailed(e.to_string()))?;
    staged
        .write_all(content)
        .map_err(|e| StorageError::SaveFailed(e.to_string()))?;
    staged
        .persist(path)
        .map_err(|e| StorageError::SaveFailed(e.error.to_string()))?;
    Ok(())
}

/// The asset inventory file.
#[derive(Debug, Clone)]
pub struct AssetStore {
    file: PathBuf,
}

impl AssetStore {
    pub const FILE_NAME: &'static str = "inventory.json";

    /// Open the inventory kept in `data_dir`, creating the directory.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(data_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        Ok(Self {
            file: data_dir.join(Self::FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Load the inventory; a missing file is an empty inventory.
    pub fn load(&self) -> StorageResult<Inventory> {
        if !self.file.exists() {
            return Ok(Inventory::default());
        }
        let content =
            fs::read_to_string(&self.file).map_err(|e| StorageError::LoadFailed(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| StorageError::LoadFailed(e.to_string()))
    }

    pub fn save(&self, inventory: &Inventory) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(inventory)?;
        write_atomic(&self.file, &content)
    }
}

/// JSON file-based run history.
#[derive(Debug, Clone)]
pub struct RunStore {
    runs_dir: PathBuf,
}

impl RunStore {
    /// Open the run history in `runs_dir`, creating it if needed.
    pub fn open(runs_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let runs_dir = runs_dir.into();
        fs::create_dir_all(&runs_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        Ok(Self { runs_dir })
    }

    /// Save a run record.
    pub fn save(&self, record: &RunRecord) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.run_file(&record.id), &content)
    }

    /// Load a run record by ID.
    pub fn load(&self, id: &RunId) -> StorageResult<RunRecord> {
        let file = self.run_file(id);

        if !file.exists() {
            return Err(StorageError::RunNotFound(id.to_string()));
        }

        let content =
            fs::read_to_string(&file).map_err(|e| StorageError::LoadFailed(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| StorageError::LoadFailed(e.to_string()))
    }

    /// Find a run by a unique ID prefix.
    pub fn find_by_prefix(&self, prefix: &str) -> StorageResult<RunRecord> {
        let matches: Vec<_> = self
            .list_ids()?
            .into_iter()
            .filter(|id| id.to_string().starts_with(prefix))
            .collect();

        match matches.as_slice() {
            [] => Err(StorageError::RunNotFound(prefix.to_string())),
            [id] => self.load(id),
            _ => Err(StorageError::LoadFailed(format!(
                "ambiguous prefix '{}': {} matches",
                prefix,
                matches.len()
            ))),
        }
    }

    /// Resolve a full ID or a prefix of one.
    pub fn find(&self, query: &str) -> StorageResult<RunRecord> {
        match query.parse::<RunId>() {
            Ok(id) => self.load(&id),
            Err(_) => self.find_by_prefix(query),
        }
    }

    /// List all run IDs.
    pub fn list_ids(&self) -> StorageResult<Vec<RunId>> {
        let mut ids = Vec::new();

        for entry in
            fs::read_dir(&self.runs_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    if let Ok(id) = stem.to_string_lossy().parse::<RunId>() {
                        ids.push(id);
                    }
                }
            }
        }

        Ok(ids)
    }

    /// All readable run records, most recent first.
    pub fn list(&self) -> StorageResult<Vec<RunRecord>> {
        let mut records: Vec<RunRecord> = self
            .list_ids()?
            .iter()
            .filter_map(|id| self.load(id).ok())
            .collect();

        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }

    /// The `count` most recent runs.
    pub fn list_recent(&self, count: usize) -> StorageResult<Vec<RunRecord>> {
        let mut records = self.list()?;
        records.truncate(count);
        Ok(records)
    }

    /// Delete a run record.
    pub fn delete(&self, id: &RunId) -> StorageResult<()> {
        let file = self.run_file(id);

        if !file.exists() {
            return Err(StorageError::RunNotFound(id.to_string()));
        }

        fs::remove_file(&file).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    /// Delete runs older than `max_age`. Returns how many were removed.
    pub fn cleanup(&self, max_age: chrono::Duration) -> StorageResult<usize> {
        let cutoff = Utc::now() - max_age;
        let mut deleted = 0;

        for record in self.list()? {
            if record.started_at < cutoff {
                self.delete(&record.id)?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    /// Delete every run. Returns how many were removed.
    pub fn clear(&self) -> StorageResult<usize> {
        let ids = self.list_ids()?;
        for id in &ids {
            self.delete(id)?;
        }
        Ok(ids.len())
    }

    fn run_file(&self, id: &RunId) -> PathBuf {
        self.runs_dir.join(format!("{}.json", id))
    }

    /// Get storage statistics.
    pub fn stats(&self) -> StorageResult<StorageStats> {
        let records = self.list()?;
        let total_size: u64 = self
            .list_ids()?
            .iter()
            .filter_map(|id| fs::metadata(self.run_file(id)).ok())
            .map(|m| m.len())
            .sum();

        Ok(StorageStats {
            run_count: records.len(),
            total_size_bytes: total_size,
            oldest_run: records.last().map(|r| r.started_at),
            newest_run: records.first().map(|r| r.started_at),
        })
    }
}

/// Run history statistics.
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub run_count: usize,
    pub total_size_bytes: u64,
    pub oldest_run: Option<DateTime<Utc>>,
    pub newest_run: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn finished(targets: &[&str]) -> RunRecord {
        let mut report = PipelineReport::default();
        report.findings.push(Finding::domain("a.example.com"));
        report.summary.resolved = 1;
        RunRecord::new(targets.iter().map(|t| t.to_string()).collect(), RunMode::Full)
            .finalize(report)
    }

    #[test]
    fn test_run_record_labels() {
        let record = finished(&["example.com"]);
        assert_eq!(record.target_label(), "example.com");
        assert!(record.summary_line().starts_with("example.com [full] - 1 hosts"));
        assert_eq!(finished(&["a.com", "b.com"]).target_label(), "2 domains");
    }

    #[test]
    fn test_run_store_roundtrip_and_prefix() {
        let dir = tempdir().unwrap();
        let store = RunStore::open(dir.path().join("runs")).unwrap();

        let record = finished(&["example.com"]);
        store.save(&record).unwrap();

        let loaded = store.find(&record.id.short()).unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.findings, record.findings);

        let loaded = store.find(&record.id.to_string()).unwrap();
        assert_eq!(loaded.targets, ["example.com"]);

        assert!(matches!(store.find("zzzz"), Err(StorageError::RunNotFound(_))));
    }

    #[test]
    fn test_run_store_list_cleanup_clear() {
        let dir = tempdir().unwrap();
        let store = RunStore::open(dir.path()).unwrap();

        let mut old = finished(&["old.com"]);
        old.started_at = Utc::now() - chrono::Duration::days(40);
        store.save(&old).unwrap();
        store.save(&finished(&["new.com"])).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].targets, ["new.com"]);
        assert_eq!(store.stats().unwrap().run_count, 2);

        assert_eq!(store.cleanup(chrono::Duration::days(30)).unwrap(), 1);
        assert_eq!(store.list_ids().unwrap().len(), 1);

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_asset_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = AssetStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_empty());

        let mut inventory = Inventory::new();
        inventory.record_domain("a.example.com").unwrap();
        store.save(&inventory).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, inventory);
    }
}
