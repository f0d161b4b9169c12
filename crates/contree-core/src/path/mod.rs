//! Logical path resolution and content root containment.

mod resolver;

pub use resolver::{PathResolver, ResolvedPath, Scope};
