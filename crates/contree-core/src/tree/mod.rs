//! Reading and writing nodes of the content tree.

mod reader;
mod writer;

use std::path::Path;

use bytes::Bytes;
pub use reader::TreeReader;
pub use writer::{ContentKind, TreeWriter, WriteOutcome};

use crate::error::Result;
use crate::fs::{self, EntryKind, SIDECAR_NAME};
use crate::node::{Node, NodeDocument, decode_sidecar};

/// The result of reading a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    /// Raw bytes of a file node.
    File(Bytes),
    /// A directory node with its shallow children.
    Node(Node),
}

/// Reads and decodes the sidecar of `dir`, if it has one.
pub(crate) async fn read_sidecar(dir: &Path) -> Result<Option<NodeDocument>> {
    match fs::read_optional(&dir.join(SIDECAR_NAME)).await? {
        Some(bytes) => decode_sidecar(&bytes).map(Some),
        None => Ok(None),
    }
}

/// Lists `dir` as `{type, name}` summaries.
pub(crate) async fn shallow_children(dir: &Path) -> Result<Vec<Node>> {
    let children = fs::list_dir(dir)
        .await?
        .into_iter()
        .map(|entry| match entry.kind {
            EntryKind::File => Node::file(entry.name),
            EntryKind::Directory => Node::folder(entry.name),
        })
        .collect();

    Ok(children)
}
