//! Configuration management for trawl.
//!
//! Provides XDG-compliant directories and the JSON settings file that
//! tunes the external tools.

mod settings;

pub use settings::{AppSettings, Paths};
