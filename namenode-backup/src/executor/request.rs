//! Operator input and its one-time validation.

use crate::namenode::{NameNodeTarget, ProtocolGeneration, TxRange};
use crate::utils::{BackupError, Result};
use crate::validate::{is_valid_hostname, is_valid_ip_address, is_valid_port};

pub const DEFAULT_PORT: i64 = 50070;

/// What the operator asked for, as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub server: Option<String>,
    pub ip: Option<String>,
    pub port: i64,
    pub release: String,
    pub get_image: bool,
    pub get_edits: bool,
    pub start_tx_id: Option<u64>,
    pub end_tx_id: Option<u64>,
}

impl Default for BackupRequest {
    fn default() -> Self {
        Self {
            server: None,
            ip: None,
            port: DEFAULT_PORT,
            release: String::new(),
            get_image: false,
            get_edits: false,
            start_tx_id: None,
            end_tx_id: None,
        }
    }
}

/// One unit of work derived from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fsimage,
    /// `None` means "whatever is current": the latest-edits endpoint on Gen1,
    /// local segment discovery on Gen2
    Edits(Option<TxRange>),
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPlan {
    pub target: NameNodeTarget,
    pub actions: Vec<Action>,
}

fn invalid(msg: impl Into<String>) -> BackupError {
    BackupError::InputValidation(msg.into())
}

/// Accepts `1`, `2`, `1.0` and `2.0`.
pub fn parse_release(release: &str) -> Option<ProtocolGeneration> {
    let release = release.trim();
    let major = release.strip_suffix(".0").unwrap_or(release);
    ProtocolGeneration::from_release(major.parse().ok()?)
}

impl BackupRequest {
    /// Check every field once. The hostname wins over the IP address when
    /// both are given, but each supplied value must be valid on its own.
    pub fn validate(&self) -> Result<BackupPlan> {
        if let Some(ip) = &self.ip {
            if !is_valid_ip_address(ip) {
                return Err(invalid(format!("invalid IP address provided: {ip}")));
            }
        }
        if let Some(server) = &self.server {
            if !is_valid_hostname(server) {
                return Err(invalid(format!("invalid hostname provided: {server}")));
            }
        }
        let host = match (&self.server, &self.ip) {
            (Some(server), _) => server.clone(),
            (None, Some(ip)) => ip.clone(),
            (None, None) => {
                return Err(invalid(
                    "you must specify the NameNode hostname (--server) or IP address (--ip)",
                ))
            }
        };

        if !is_valid_port(self.port) {
            return Err(invalid(format!(
                "invalid port number provided: {} (expected 1024-65534)",
                self.port
            )));
        }
        let port = u16::try_from(self.port)
            .map_err(|_| invalid(format!("invalid port number provided: {}", self.port)))?;

        let generation = parse_release(&self.release).ok_or_else(|| {
            invalid(format!(
                "invalid release '{}': the Apache Hadoop release must be 1 or 2",
                self.release
            ))
        })?;

        if !self.get_image && !self.get_edits {
            return Err(invalid("specify --getimage and/or --getedits"));
        }

        let range = match (self.start_tx_id, self.end_tx_id) {
            (None, None) => None,
            (Some(start), Some(end)) => Some(TxRange::new(start, end).ok_or_else(|| {
                invalid(format!("--startTxId {start} is greater than --endTxId {end}"))
            })?),
            _ => return Err(invalid("--startTxId and --endTxId must be given together")),
        };
        if range.is_some() && !self.get_edits {
            return Err(invalid("--startTxId/--endTxId only apply to --getedits"));
        }

        let mut actions = Vec::new();
        if self.get_image {
            actions.push(Action::Fsimage);
        }
        if self.get_edits {
            actions.push(Action::Edits(range));
        }

        Ok(BackupPlan {
            target: NameNodeTarget::new(host, port, generation),
            actions,
        })
    }
}
