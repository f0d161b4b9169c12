//! Response types for HTTP handlers.

mod backups;
mod errors;
mod monitors;
mod nodes;

pub use backups::*;
pub use errors::*;
pub use monitors::*;
pub use nodes::*;
