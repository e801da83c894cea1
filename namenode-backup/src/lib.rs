//! NameNode Backup Library
//!
//! Retrieves fsimage and edits checkpoints from an HDFS NameNode, stores them
//! with a SHA-1 sidecar and bundles both into a `.tar.gz`.

pub mod archive;
pub mod config;
pub mod executor;
pub mod fs;
pub mod namenode;
pub mod transfer;
pub mod utils;
pub mod validate;
pub mod verify;

// Re-export commonly used types
pub use config::Config;
pub use executor::artifact::{ArtifactKind, BackupArtifact, RunReport};
pub use executor::request::BackupRequest;
pub use executor::BackupRunner;
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
