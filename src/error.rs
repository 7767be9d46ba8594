//! Error types for trawl.
//!
//! Uses `thiserror` for ergonomic error definitions. Scanner adapters report
//! [`ScanError`]; the orchestrator wraps those in [`PipelineError`] together
//! with the stage and scanner that produced them.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a single scanner adapter.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The external executable could not be located.
    #[error("{tool} not found in PATH")]
    ToolNotFound { tool: String },

    /// The tool ran but failed, or its output could not be understood.
    #[error("{tool} failed: {reason}")]
    ExecutionFailed { tool: String, reason: String },

    /// A required credential or setting is missing.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// A required local dependency (e.g. a resolver list) is unavailable.
    #[error("missing dependency: {0}")]
    DependencyMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Shorthand for [`ScanError::ToolNotFound`].
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Shorthand for [`ScanError::ExecutionFailed`].
    pub fn execution(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error only means the tool is not installed.
    pub fn is_tool_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}

/// Result type alias for scanner operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Error that aborts a pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} stage: {scanner} failed: {source}")]
    Scanner {
        stage: Stage,
        scanner: String,
        #[source]
        source: ScanError,
    },

    #[error("{stage} stage: {scanner} worker panicked")]
    WorkerPanicked { stage: Stage, scanner: String },
}

impl PipelineError {
    pub(crate) fn scanner(stage: Stage, scanner: impl Into<String>, source: ScanError) -> Self {
        Self::Scanner {
            stage,
            scanner: scanner.into(),
            source,
        }
    }

    /// The stage in which the failure happened.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Scanner { stage, .. } | Self::WorkerPanicked { stage, .. } => *stage,
        }
    }
}

/// Result type alias for pipeline executions.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a home directory for configuration")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage directory error: {0}")]
    DirectoryError(String),

    #[error("failed to save: {0}")]
    SaveFailed(String),

    #[error("failed to load: {0}")]
    LoadFailed(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("cannot store {kind} without a {field}")]
    MissingKey {
        kind: &'static str,
        field: &'static str,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by CLI command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    RunId(#[from] crate::types::RunIdError),

    #[error(transparent)]
    Port(#[from] crate::types::PortError),

    #[error(transparent)]
    Target(#[from] crate::types::TargetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI handlers.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found_is_detected_by_kind() {
        let err = ScanError::tool_not_found("naabu");
        assert!(err.is_tool_not_found());
        assert_eq!(err.to_string(), "naabu not found in PATH");

        let err = ScanError::execution("naabu", "exit status 2");
        assert!(!err.is_tool_not_found());
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::scanner(
            Stage::Discovery,
            "Subfinder",
            ScanError::execution("subfinder", "exit status 1"),
        );
        assert_eq!(err.stage(), Stage::Discovery);
        assert_eq!(
            err.to_string(),
            "discovery stage: Subfinder failed: subfinder failed: exit status 1"
        );
    }
}
