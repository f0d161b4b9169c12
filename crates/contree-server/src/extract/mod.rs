//! HTTP request extractors with error handling tailored to the content API.
//!
//! - [`NodePath`] - the decoded logical path of the request URI
//! - [`Json`] - JSON deserialization with structured error responses
//! - [`Payload`] - raw request body bytes with structured error responses

mod node_path;
pub mod reject;

pub use crate::extract::node_path::NodePath;
pub use crate::extract::reject::{Json, Payload};
