//! Request extractors that turn axum rejections into [`Error`] responses.
//!
//! [`Error`]: crate::handler::Error

pub mod enhanced_json;
pub mod enhanced_payload;

pub use self::enhanced_json::Json;
pub use self::enhanced_payload::Payload;
