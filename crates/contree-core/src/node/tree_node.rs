use serde::{Deserialize, Serialize};

use super::{NodeDocument, NodeMetadata, NodeType};

/// A node of the content tree as returned to callers.
///
/// `name` always comes from the filesystem entry. `children` is absent for
/// files and for directories without entries; it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Semantic type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Basename of the filesystem entry.
    pub name: String,
    /// Sidecar metadata, flattened into the node.
    #[serde(flatten)]
    pub metadata: NodeMetadata,
    /// Live children, when the node is a non-empty directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// Creates a leaf file node.
    pub fn file(name: impl Into<String>) -> Self {
        Self::shallow(NodeType::File, name)
    }

    /// Creates a plain folder node without metadata or children.
    pub fn folder(name: impl Into<String>) -> Self {
        Self::shallow(NodeType::Folder, name)
    }

    /// Creates a `{type, name}` summary node.
    pub fn shallow(node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            node_type,
            name: name.into(),
            metadata: NodeMetadata::default(),
            children: None,
        }
    }

    /// Returns `true` if the node is backed by a directory.
    #[inline]
    pub fn is_directory(&self) -> bool {
        self.node_type.is_directory()
    }

    /// Returns the children, or an empty slice for leaves.
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Returns the sidecar document this node would persist as.
    pub fn to_document(&self) -> NodeDocument {
        NodeDocument {
            node_type: self.node_type,
            metadata: self.metadata.clone(),
        }
    }
}
