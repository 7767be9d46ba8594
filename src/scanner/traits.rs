//! Scanner trait abstraction.
//!
//! Every external tool sits behind [`Scanner`], so the orchestrator can be
//! exercised against fakes that return canned findings without spawning a
//! process.

use crate::error::ScanResult;
use crate::types::Finding;
use async_trait::async_trait;
use std::sync::Arc;

/// A wrapped reconnaissance tool.
///
/// # Contract
///
/// - `execute(&[])` returns `Ok(vec![])` without touching the tool.
/// - A missing executable is reported as [`ScanError::ToolNotFound`] so
///   callers can degrade instead of aborting.
/// - Adapters keep no state between calls beyond construction-time
///   configuration.
///
/// [`ScanError::ToolNotFound`]: crate::error::ScanError::ToolNotFound
///
/// # Example
///
/// ```ignore
/// use trawl::scanner::{Scanner, SubfinderScanner};
///
/// let scanner = SubfinderScanner::new(false);
/// let findings = scanner.execute(&["example.com".to_string()]).await?;
/// ```
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Display name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run the tool over `input` tokens.
    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>>;
}

/// A scanner shared between the pipeline and its worker tasks.
pub type SharedScanner = Arc<dyn Scanner>;
