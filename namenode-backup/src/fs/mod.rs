//! Local filesystem helpers: edits discovery and backup directory checks.

pub mod edits;
pub mod backup_dir;
