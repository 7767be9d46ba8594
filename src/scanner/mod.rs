//! Scanner module - wrappers around external reconnaissance tools.
//!
//! Every tool sits behind the [`Scanner`] trait. Adapters spawn the tool
//! with `tokio::process`, normalize its output into [`Finding`]s and report
//! a missing executable as [`ScanError::ToolNotFound`].
//!
//! [`Finding`]: crate::types::Finding
//! [`ScanError::ToolNotFound`]: crate::error::ScanError::ToolNotFound

pub mod gowitness;
pub mod httpx;
pub mod naabu;
pub mod nmap;
pub mod process;
pub mod puredns;
pub mod resolvers;
pub mod samoscout;
pub mod shosubgo;
pub mod subdog;
pub mod subfinder;
pub mod traits;

pub use gowitness::{list_screenshot_domains, serve_report, GowitnessScanner};
pub use httpx::HttpxScanner;
pub use naabu::NaabuScanner;
pub use nmap::NmapScanner;
pub use puredns::PurednsScanner;
pub use resolvers::{ResolverList, DEFAULT_RESOLVERS_URL};
pub use samoscout::SamoscoutScanner;
pub use shosubgo::ShosubgoScanner;
pub use subdog::SubdogScanner;
pub use subfinder::SubfinderScanner;
pub use traits::{Scanner, SharedScanner};
