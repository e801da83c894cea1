//! Configuration management for the backup tool.
//!
//! Loads configuration from a TOML file; command-line flags override
//! individual values afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub edits: EditsConfig,
    #[serde(default)]
    pub namenode: NameNodeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory the fsimage/edits copies are written to
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Delete the downloaded file and its sidecar once archived
    #[serde(default)]
    pub remove_originals: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditsConfig {
    /// Local copy of the NameNode `current` directory holding edit segments
    #[serde(default = "default_edits_dir")]
    pub dir: PathBuf,

    /// Only segments modified within this many seconds are fetched
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameNodeConfig {
    /// Status page scraped for the Hadoop version
    #[serde(default = "default_status_page")]
    pub status_page: String,

    /// Longest silence tolerated between reads of a response. Downloads of
    /// any size run as long as bytes keep arriving.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Deadline for the whole status page request
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Write buffer size for downloads in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_backup_dir() -> PathBuf {
    PathBuf::from("/tmp/hadoop.backup")
}

fn default_edits_dir() -> PathBuf {
    PathBuf::from("/hadoop/namenode/dfs/sn/current")
}

fn default_lookback_secs() -> i64 {
    86_400 // one day
}

fn default_status_page() -> String {
    "dfshealth.jsp".to_string()
}

fn default_read_timeout_secs() -> u64 {
    300
}

fn default_probe_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_chunk_size() -> usize {
    8192
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            remove_originals: false,
        }
    }
}

impl Default for EditsConfig {
    fn default() -> Self {
        Self {
            dir: default_edits_dir(),
            lookback_secs: default_lookback_secs(),
        }
    }
}

impl Default for NameNodeConfig {
    fn default() -> Self {
        Self {
            status_page: default_status_page(),
            read_timeout_secs: default_read_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup: BackupConfig::default(),
            edits: EditsConfig::default(),
            namenode: NameNodeConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.namenode.read_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.namenode.probe_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.namenode.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backup]
            dir = "/srv/nn-backup"

            [edits]
            lookback_secs = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.backup.dir, PathBuf::from("/srv/nn-backup"));
        assert!(!config.backup.remove_originals);
        assert_eq!(config.edits.lookback_secs, 3600);
        assert_eq!(config.edits.dir, PathBuf::from("/hadoop/namenode/dfs/sn/current"));
        assert_eq!(config.namenode.status_page, "dfshealth.jsp");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.edits.lookback_secs, 86_400);
        assert_eq!(config.namenode.chunk_size, 8192);
        assert_eq!(config.read_timeout(), Duration::from_secs(300));
        assert_eq!(config.probe_timeout(), Duration::from_secs(30));
    }
}
