//! Backup directory preconditions and file naming.

use crate::utils::{BackupError, Result};
use nix::unistd::{access, AccessFlags};
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Fail unless `dir` exists, is a directory, and the current user may write to it.
pub fn ensure_writable(dir: &Path) -> Result<()> {
    let metadata = std::fs::metadata(dir).map_err(|_| {
        BackupError::Environment(format!(
            "the backup directory {} does not exist; create it or point [backup] dir elsewhere",
            dir.display()
        ))
    })?;

    if !metadata.is_dir() {
        return Err(BackupError::Environment(format!(
            "the backup path {} is not a directory",
            dir.display()
        )));
    }

    access(dir, AccessFlags::W_OK | AccessFlags::X_OK).map_err(|errno| {
        BackupError::Environment(format!(
            "the backup directory {} is not writable by the current user ({})",
            dir.display(),
            errno.desc()
        ))
    })?;

    Ok(())
}

/// Local time stamp embedded in backup file names.
pub fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
