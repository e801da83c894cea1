//! Utility modules for the NameNode backup tool.

pub mod errors;
pub mod logger;

pub use errors::{BackupError, FetchError, Result, ScanError};
