//! Core type definitions.
//!
//! Newtypes and closed enums for everything that crosses a stage boundary,
//! so malformed ports or mismatched payloads are rejected at the edges.

mod finding;
mod host;
mod port;
mod run_id;
mod token;

pub use finding::{
    Finding, FindingKind, OpenPort, PortService, Protocol, ScreenshotBatch, WebService,
};
pub use host::{host_from_url, is_valid_hostname, root_domain, TargetError, TargetList};
pub use port::{Port, PortError, PortRange, PortSpec};
pub use run_id::{RunId, RunIdError};
pub use token::{group_by_root_domain, PortToken, RootDomainGroup, ScreenshotToken, TokenError};
