//! Typed sidecar document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::NodeType;

/// Point in time stored in a sidecar.
///
/// New values are written as epoch milliseconds. ISO-8601 strings found on
/// disk are kept verbatim so a rewrite never changes their representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    /// An ISO-8601 timestamp string.
    Iso(String),
}

impl Timestamp {
    /// Returns the current time in epoch milliseconds.
    pub fn now() -> Self {
        Self::Millis(jiff::Timestamp::now().as_millisecond())
    }

    /// Returns the timestamp as epoch milliseconds, if it can be interpreted.
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(millis) => Some(*millis),
            Self::Iso(value) => value
                .parse::<jiff::Timestamp>()
                .ok()
                .map(|ts| ts.as_millisecond()),
        }
    }

    /// Returns a representation safe to embed in a file name.
    pub fn file_stamp(&self) -> String {
        if let Some(millis) = self.as_millis() {
            return millis.to_string();
        }

        match self {
            Self::Millis(millis) => millis.to_string(),
            Self::Iso(value) => value
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect(),
        }
    }
}

/// Metadata shared by sidecar documents and merged nodes.
///
/// Unknown fields (a page's `components`, a site's template path, ...) are
/// passed through untouched in [`NodeMetadata::extra`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Stable identifier assigned on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Time of the last metadata write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Type-specific passthrough fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeMetadata {
    /// Returns the identifier when it is present and not blank.
    pub fn stable_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// The content of a `.content.json` sidecar.
///
/// A document never carries `name` or `children`: both are derived from the
/// filesystem when the document is merged into a [`Node`].
///
/// [`Node`]: super::Node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Declared semantic type of the directory.
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// Remaining metadata.
    #[serde(flatten)]
    pub metadata: NodeMetadata,
}

impl NodeDocument {
    /// Creates an empty document of the given type.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            metadata: NodeMetadata::default(),
        }
    }

    /// Returns the timestamp that identifies this version of the document.
    pub fn version_stamp(&self) -> Option<&Timestamp> {
        self.metadata
            .updated_at
            .as_ref()
            .or(self.metadata.created_at.as_ref())
    }
}
