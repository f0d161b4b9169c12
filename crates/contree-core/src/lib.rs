#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for content tree lifecycle events.
pub const TRACING_TARGET_ENGINE: &str = "contree_core::engine";

/// Tracing target for path resolution and containment checks.
///
/// Traversal attempts are logged here at `warn`.
pub const TRACING_TARGET_PATH: &str = "contree_core::path";

/// Tracing target for sidecar decoding and merging.
pub const TRACING_TARGET_CODEC: &str = "contree_core::codec";

/// Tracing target for low-level filesystem helpers.
pub const TRACING_TARGET_FS: &str = "contree_core::fs";

/// Tracing target for tree walks and node reads.
pub const TRACING_TARGET_READER: &str = "contree_core::reader";

/// Tracing target for node writes and deletes.
pub const TRACING_TARGET_WRITER: &str = "contree_core::writer";

/// Tracing target for backup creation, listing and promotion.
pub const TRACING_TARGET_BACKUP: &str = "contree_core::backup";

mod backup;
mod config;
mod engine;
mod error;
pub mod fs;
pub mod node;
pub mod path;
pub mod tree;

pub use backup::BackupManager;
pub use config::{
    ContentConfig, ContentConfigBuilder, ContentConfigBuilderError, DEFAULT_LOCK_STRIPES,
    DEFAULT_MAX_WALK_DEPTH, WalkErrorPolicy,
};
pub use engine::ContentTree;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use node::{Node, NodeType, Timestamp};
pub use path::{PathResolver, Scope};
pub use tree::{ContentKind, NodeContent, WriteOutcome};
