//! # trawl - A Reconnaissance Pipeline
//!
//! trawl turns a list of root domains into an inventory of live assets and
//! open services by chaining external recon tools (subfinder, puredns,
//! httpx, naabu, nmap, gowitness and friends) through a fixed topology.
//!
//! ## Features
//!
//! - **Parallel discovery**: every subdomain source runs concurrently and
//!   the results are merged without duplicates
//! - **DNS filtering**: only hosts that resolve reach the probes
//! - **Probe + port scan**: HTTP probing runs alongside a port sweep whose
//!   hits are fingerprinted
//! - **Graceful degradation**: a tool that is not installed is skipped with
//!   a warning instead of failing the run
//! - **Persistent inventory**: findings merge into a JSON asset inventory,
//!   and every run is kept in a browsable history
//! - **Multiple Output Formats**: Plain text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use trawl::pipeline::Pipeline;
//! use trawl::scanner::{HttpxScanner, NaabuScanner, NmapScanner, SubfinderScanner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::new()
//!         .add_discovery_scanner(SubfinderScanner::new(false))
//!         .set_probe(HttpxScanner::new())
//!         .add_port_scanner(NaabuScanner::new())
//!         .add_port_scanner(NmapScanner::new());
//!
//!     let report = pipeline.execute(&["example.com".to_string()]).await?;
//!     for web in report.web_services() {
//!         println!("{} [{}] {}", web.url, web.status_code, web.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Findings, ports, token codecs and hostname helpers
//! - [`scanner`] - The `Scanner` trait and one adapter per external tool
//! - [`pipeline`] - The stage orchestrator
//! - [`storage`] - Asset inventory and run history persistence
//! - [`config`] - Paths and settings
//! - [`error`] - Error types
//! - [`output`] - Output formatting utilities
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, PipelineError, ScanError};
pub use pipeline::{Pipeline, PipelineReport, PipelineSummary, Stage};
pub use scanner::{Scanner, SharedScanner};
pub use types::{Finding, FindingKind, Port, PortSpec, RunId};
