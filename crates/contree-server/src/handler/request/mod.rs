//! Request types for HTTP handlers.

mod backups;

pub use backups::*;
