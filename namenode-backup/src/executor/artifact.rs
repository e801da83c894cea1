//! Artifact descriptors and the per-run report.

use crate::namenode::{MetadataRequest, NameNodeTarget, TxRange};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Fsimage,
    Edits,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Fsimage => write!(f, "fsimage"),
            ArtifactKind::Edits => write!(f, "edits"),
        }
    }
}

/// Everything needed to fetch one file: where from and what to call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactJob {
    pub kind: ArtifactKind,
    pub range: Option<TxRange>,
    pub url: String,
}

impl ArtifactJob {
    pub fn fsimage(target: &NameNodeTarget) -> Self {
        Self {
            kind: ArtifactKind::Fsimage,
            range: None,
            url: MetadataRequest::Fsimage.url(target),
        }
    }

    pub fn edits(target: &NameNodeTarget, range: Option<TxRange>) -> Self {
        Self {
            kind: ArtifactKind::Edits,
            range,
            url: MetadataRequest::Edits(range).url(target),
        }
    }

    /// `fsimage-<host>-<ts>`, `edits-<start>-<end>-<host>-<ts>` or
    /// `edits-<host>-<ts>` when no range is known.
    pub fn file_name(&self, host: &str, timestamp: &str) -> String {
        match self.range {
            Some(range) => format!(
                "{}-{}-{}-{}-{}",
                self.kind, range.start, range.end, host, timestamp
            ),
            None => format!("{}-{}-{}", self.kind, host, timestamp),
        }
    }
}

/// A downloaded, hashed and archived checkpoint file.
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    pub kind: ArtifactKind,
    pub range: Option<TxRange>,
    pub local_path: PathBuf,
    pub content_hash: String,
    pub source_url: String,
    pub archive_path: PathBuf,
    pub bytes: u64,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub artifacts: Vec<BackupArtifact>,
}

impl RunReport {
    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(|a| a.bytes).sum()
    }

    pub fn archives(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|a| a.archive_path.as_path())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for artifact in &self.artifacts {
            writeln!(
                f,
                "{}\t{}\t{}\t{}",
                artifact.kind,
                artifact.content_hash,
                artifact.bytes,
                artifact.archive_path.display()
            )?;
        }
        Ok(())
    }
}
