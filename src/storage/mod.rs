//! Persistence for pipeline output.
//!
//! An [`Inventory`] of assets and ports merged across runs, plus a history
//! of individual runs. Both are stored as JSON files.

mod inventory;
mod json_store;

pub use inventory::{Asset, Inventory, PortRecord, Upsert};
pub use json_store::{AssetStore, RunMode, RunRecord, RunStore, StorageStats};
