//! Discovery of recently written edit segments.
//!
//! A Hadoop 2.x NameNode (or a checkpointing secondary) keeps finalized
//! segments as `edits_<startTxId>-<endTxId>` in its `current` directory. The
//! transaction ids come from the filename alone; the file content is never
//! read.

use crate::namenode::TxRange;
use crate::utils::ScanError;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// A finalized edits file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSegment {
    pub file_name: String,
    pub path: PathBuf,
    pub range: TxRange,
    pub modified_at: DateTime<Utc>,
}

fn segment_pattern() -> &'static Regex {
    static SEGMENT: OnceLock<Regex> = OnceLock::new();
    SEGMENT.get_or_init(|| Regex::new(r"^edits_(.+)-(.+)$").expect("static regex"))
}

/// List the edit segments in `dir` modified within the last `lookback_secs`.
///
/// Every call re-reads the directory. The result is unordered.
/// Files shaped like `edits_<a>-<b>` whose tokens are not transaction ids
/// are skipped with a warning.
pub fn scan(dir: &Path, lookback_secs: i64) -> Result<Vec<EditSegment>, ScanError> {
    if lookback_secs < 0 {
        return Err(ScanError::InvalidLookbackWindow(lookback_secs));
    }

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(lookback_secs.unsigned_abs()))
        .unwrap_or(UNIX_EPOCH);

    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScanError::DirectoryNotFound(dir.to_path_buf()),
        ErrorKind::PermissionDenied => ScanError::PermissionDenied(dir.to_path_buf()),
        _ => ScanError::Io {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;

    let io_err = |path: &Path, source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut segments = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();

        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some(caps) = segment_pattern().captures(&file_name) else {
            continue;
        };

        // follows symlinks; a dangling link is not a segment
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Skipping {}: dangling symlink", path.display());
                continue;
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        if !metadata.is_file() {
            debug!("Ignoring {}: not a regular file", file_name);
            continue;
        }
        let modified = metadata.modified().map_err(|e| io_err(&path, e))?;
        if modified < cutoff {
            debug!("Ignoring {}: older than the lookback window", file_name);
            continue;
        }

        let Some(range) = parse_range(&caps[1], &caps[2]) else {
            warn!(
                "Skipping {}: name does not carry a valid transaction id range",
                path.display()
            );
            continue;
        };

        segments.push(EditSegment {
            file_name,
            path,
            range,
            modified_at: DateTime::<Utc>::from(modified),
        });
    }

    Ok(segments)
}

fn parse_range(start: &str, end: &str) -> Option<TxRange> {
    let start = start.parse::<u64>().ok()?;
    let end = end.parse::<u64>().ok()?;
    TxRange::new(start, end)
}
