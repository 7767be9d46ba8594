//! Public resolver list used by the DNS filter.
//!
//! The list is refreshed from a remote URL before each resolution run. A
//! failed refresh falls back to the copy already on disk; only the absence
//! of any copy is an error.

use crate::error::{ScanError, ScanResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// File name of the resolver list.
pub const RESOLVERS_FILE: &str = "resolvers.txt";

/// Where the list is downloaded from unless configured otherwise.
pub const DEFAULT_RESOLVERS_URL: &str =
    "https://raw.githubusercontent.com/trickest/resolvers/main/resolvers.txt";

const REFRESH_LABEL: &str = "resolver-refresh";

#[derive(Debug, Clone)]
pub struct ResolverList {
    url: String,
    path: PathBuf,
    timeout: Duration,
}

impl ResolverList {
    /// A list stored at `path`, refreshed from the default URL.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            url: DEFAULT_RESOLVERS_URL.to_string(),
            path: path.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `resolvers.txt` in the working directory if it exists, otherwise the
    /// same file name under `data_dir`.
    pub fn default_path(data_dir: &Path) -> PathBuf {
        let local = PathBuf::from(RESOLVERS_FILE);
        if local.is_file() {
            local
        } else {
            data_dir.join(RESOLVERS_FILE)
        }
    }

    /// Download the list and atomically replace the local copy.
    ///
    /// Returns the number of bytes written.
    pub async fn refresh(&self) -> ScanResult<usize> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ScanError::execution(REFRESH_LABEL, e.to_string()))?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ScanError::execution(REFRESH_LABEL, e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ScanError::execution(
                REFRESH_LABEL,
                format!("HTTP {}", response.status().as_u16()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ScanError::execution(REFRESH_LABEL, e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
        staged.write_all(&body)?;
        staged.flush()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        Ok(body.len())
    }

    /// Refresh if possible and return the path of a usable list.
    pub async fn ensure(&self) -> ScanResult<&Path> {
        match self.refresh().await {
            Ok(bytes) => info!(path = %self.path.display(), bytes, "resolver list updated"),
            Err(e) => warn!(error = %e, "resolver list refresh failed, using local copy"),
        }

        if self.path.is_file() {
            Ok(&self.path)
        } else {
            Err(ScanError::DependencyMissing(format!(
                "resolver list not found at {}",
                self.path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn offline(path: PathBuf) -> ResolverList {
        ResolverList::new(path)
            .with_url("http://127.0.0.1:9/resolvers.txt")
            .with_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_local_copy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(RESOLVERS_FILE);
        std::fs::write(&path, "1.1.1.1\n8.8.8.8\n").unwrap();

        let list = offline(path.clone());
        assert_eq!(list.ensure().await.unwrap(), path.as_path());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1.1.1.1\n8.8.8.8\n");
    }

    #[tokio::test]
    async fn test_no_list_at_all_is_dependency_missing() {
        let dir = tempdir().unwrap();
        let list = offline(dir.path().join(RESOLVERS_FILE));
        let err = list.ensure().await.unwrap_err();
        assert!(matches!(err, ScanError::DependencyMissing(_)));
    }

    #[test]
    fn test_default_path_under_data_dir() {
        let dir = tempdir().unwrap();
        let path = ResolverList::default_path(dir.path());
        assert!(path.ends_with(RESOLVERS_FILE));
    }
}
