//! HTTP transfer of checkpoint files from the NameNode.

pub mod fetch;
pub mod progress;
pub mod progress_stream;

use crate::config::Config;
use crate::utils::{BackupError, Result};

pub use fetch::Fetcher;

/// Shared client for the status probe and the image servlet.
///
/// Only connection setup and idle reads are bounded here; a total deadline
/// would cap the size of a file that can be fetched.
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("namenode-backup/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(config.connect_timeout())
        .read_timeout(config.read_timeout())
        .build()
        .map_err(|e| BackupError::Client(e.to_string()))
}
