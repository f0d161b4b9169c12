//! Node response types.

use serde::{Deserialize, Serialize};

/// Confirms that a node and everything below it was removed.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNode {
    /// Request path of the removed node.
    pub path: String,
}
