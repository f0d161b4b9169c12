//! Node model and the `.content.json` sidecar codec.
//!
//! A [`Node`] is what the engine hands out: its `type` and `name` come from the
//! filesystem, everything else comes from the directory's sidecar document
//! ([`NodeDocument`]). The codec functions in this module convert between the
//! on-disk bytes, the typed document, and the merged node.

mod codec;
mod document;
mod node_type;
mod stamp;
mod tree_node;
mod validate;

pub(crate) use codec::document_from_value;
pub use codec::{decode_sidecar, encode_sidecar, merge_with_directory};
pub use document::{NodeDocument, NodeMetadata, Timestamp};
pub use node_type::NodeType;
pub use stamp::stamp_document;
pub use tree_node::Node;
pub use validate::{NameSource, NodeViolation, validate_node};
