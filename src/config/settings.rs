//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration, data, and cache.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{ResolverList, DEFAULT_RESOLVERS_URL};
use crate::types::PortSpec;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/trawl)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/trawl)
    pub data_dir: PathBuf,
    /// Cache directory (~/.cache/trawl)
    pub cache_dir: PathBuf,
}

impl Paths {
    /// Resolve the XDG directories and make sure they exist.
    pub fn resolve() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "trawl", "trawl").ok_or(ConfigError::DirectoryNotFound)?;

        Self::under(
            project.config_dir(),
            project.data_dir(),
            project.cache_dir(),
        )
    }

    /// Use explicit directories, creating them if needed.
    pub fn under(config_dir: &Path, data_dir: &Path, cache_dir: &Path) -> ConfigResult<Self> {
        let paths = Self {
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
            cache_dir: cache_dir.to_path_buf(),
        };

        fs::create_dir_all(&paths.config_dir)?;
        fs::create_dir_all(&paths.data_dir)?;
        fs::create_dir_all(&paths.cache_dir)?;

        Ok(paths)
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Get the path to the run history directory.
    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join("runs")
    }

    /// Default screenshot base directory.
    pub fn screenshots_dir(&self) -> PathBuf {
        self.data_dir.join("screenshots")
    }
}

/// Application-wide settings.
///
/// Every field has a default, so a partial `settings.json` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Screenshot base directory. Defaults to `<data_dir>/screenshots`.
    pub screenshot_dir: Option<PathBuf>,
    /// Where the resolver list is downloaded from.
    pub resolvers_url: String,
    /// Local resolver list. Defaults to `./resolvers.txt` when present,
    /// otherwise `<data_dir>/resolvers.txt`.
    pub resolvers_path: Option<PathBuf>,
    pub resolver_download_timeout_secs: u64,
    pub httpx_timeout_secs: u64,
    pub httpx_retries: u32,
    /// Naabu `-top-ports` value.
    pub naabu_top_ports: String,
    /// Ports the sweep skips because the prober covers them.
    pub naabu_exclude_ports: String,
    pub gowitness_threads: usize,
    /// Status codes worth a screenshot.
    pub gowitness_status_filter: String,
    /// Default output format.
    pub default_output_format: String,
    /// Save a run record after every successful scan.
    pub auto_save_runs: bool,
    /// Shodan API key for Shosubgo. `SHODAN_API_KEY` takes precedence.
    pub shodan_api_key: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            screenshot_dir: None,
            resolvers_url: DEFAULT_RESOLVERS_URL.to_string(),
            resolvers_path: None,
            resolver_download_timeout_secs: 30,
            httpx_timeout_secs: 10,
            httpx_retries: 2,
            naabu_top_ports: "1000".to_string(),
            naabu_exclude_ports: "80,443".to_string(),
            gowitness_threads: 10,
            gowitness_status_filter: "200,403,401".to_string(),
            default_output_format: "plain".to_string(),
            auto_save_runs: true,
            shodan_api_key: None,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location; a missing file yields
    /// defaults.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let file = paths.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default location.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        let file = paths.settings_file();

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&file, content).map_err(|e| ConfigError::WriteFailed {
            path: file,
            reason: e.to_string(),
        })
    }

    /// Reject values the tools would choke on.
    pub fn validate(&self) -> ConfigResult<()> {
        self.naabu_exclude()?;
        if self.naabu_top_ports.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "naabu_top_ports",
                reason: "must not be empty".to_string(),
            });
        }
        if self.gowitness_threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "gowitness_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.gowitness_status_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "gowitness_status_filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Ports excluded from the sweep. An empty string excludes nothing.
    pub fn naabu_exclude(&self) -> ConfigResult<PortSpec> {
        if self.naabu_exclude_ports.trim().is_empty() {
            return Ok(PortSpec::new());
        }
        self.naabu_exclude_ports
            .parse()
            .map_err(|e: crate::types::PortError| ConfigError::InvalidValue {
                key: "naabu_exclude_ports",
                reason: e.to_string(),
            })
    }

    pub fn screenshot_dir(&self, paths: &Paths) -> PathBuf {
        self.screenshot_dir
            .clone()
            .unwrap_or_else(|| paths.screenshots_dir())
    }

    pub fn resolver_list(&self, paths: &Paths) -> ResolverList {
        let path = self
            .resolvers_path
            .clone()
            .unwrap_or_else(|| ResolverList::default_path(&paths.data_dir));

        ResolverList::new(path)
            .with_url(&self.resolvers_url)
            .with_timeout(Duration::from_secs(self.resolver_download_timeout_secs))
    }

    /// The Shodan key, preferring `from_env` over the settings file.
    pub fn shodan_key(&self, from_env: Option<String>) -> Option<String> {
        from_env
            .or_else(|| self.shodan_api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }
}
