//! Backup request types.

use serde::{Deserialize, Serialize};

/// Identifies the backup to promote to live metadata.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteBackup {
    /// Backup file name, e.g. `.content-1700000000000.json`.
    pub name: String,
}
