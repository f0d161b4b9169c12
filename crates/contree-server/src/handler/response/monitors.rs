//! Monitor response types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Content root health status.
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    /// Whether the content root is a readable directory.
    pub is_healthy: bool,
    /// Canonical path of the content root.
    pub content_root: String,
    /// Timestamp when this status was generated.
    pub checked_at: Timestamp,
}
