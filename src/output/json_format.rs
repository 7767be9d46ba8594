//! JSON output formatting.

use serde::Serialize;
use std::io;

/// Serialize any report value as pretty JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

/// Print a report value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}
