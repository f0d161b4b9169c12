//! Backup response types.

use serde::{Deserialize, Serialize};

/// Backups available for one directory.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backups {
    /// Request path of the directory.
    pub path: String,
    /// Backup file names, sorted by name.
    pub backups: Vec<String>,
}

/// A freshly created backup.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCreated {
    /// Request path of the directory.
    pub path: String,
    /// File name of the backup.
    pub name: String,
}
