//! Sidecar (de)serialization and directory merge.

use serde_json::Value;

use super::{Node, NodeDocument, NodeType};
use crate::TRACING_TARGET_CODEC;
use crate::error::{Error, Result};

/// Fields that are derived from the filesystem and never stored.
const DERIVED_FIELDS: [&str; 2] = ["name", "children"];

/// Decodes sidecar bytes into a document.
///
/// Malformed JSON, a non-object document or mistyped known fields are reported
/// as [`ErrorKind::Parse`]. Stored `name` and `children` fields are dropped.
///
/// [`ErrorKind::Parse`]: crate::ErrorKind::Parse
pub fn decode_sidecar(bytes: &[u8]) -> Result<NodeDocument> {
    let mut value: Value = serde_json::from_slice(bytes)
        .map_err(|err| Error::parse(format!("sidecar is not valid JSON: {err}")).with_source(err))?;

    document_from_value(&mut value)
        .map_err(|err| Error::parse(format!("sidecar has an invalid shape: {err}")).with_source(err))
}

/// Converts an already validated JSON value into a document.
pub(crate) fn document_from_value(value: &mut Value) -> serde_json::Result<NodeDocument> {
    if let Some(object) = value.as_object_mut() {
        for field in DERIVED_FIELDS {
            object.remove(field);
        }
    } else {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }

    serde_json::from_value(value.take())
}

/// Encodes a document into sidecar bytes (pretty-printed, newline terminated).
pub fn encode_sidecar(document: &NodeDocument) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(document)
        .map_err(|err| Error::internal("failed to encode sidecar").with_source(err))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Merges an optional sidecar document with a directory's live listing.
///
/// The name always comes from the directory. A missing document yields a
/// plain folder. `children` is omitted when the directory has no entries.
pub fn merge_with_directory(
    document: Option<NodeDocument>,
    name: &str,
    children: Vec<Node>,
) -> Node {
    let document = document.unwrap_or_else(|| NodeDocument::new(NodeType::Folder));

    let node_type = if document.node_type.is_directory() {
        document.node_type
    } else {
        tracing::warn!(
            target: TRACING_TARGET_CODEC,
            name = %name,
            "Sidecar declares a file type for a directory, treating it as a folder"
        );
        NodeType::Folder
    };

    Node {
        node_type,
        name: name.to_owned(),
        metadata: document.metadata,
        children: (!children.is_empty()).then_some(children),
    }
}
