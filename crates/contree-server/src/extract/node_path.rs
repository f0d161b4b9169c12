use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use derive_more::{Deref, Display};
use percent_encoding::percent_decode_str;

use crate::handler::{Error, ErrorKind};

/// Tracing target for path extraction.
const TRACING_TARGET: &str = "contree_server::extract::node_path";

/// The percent-decoded path of the request URI, including its route prefix.
///
/// The value is handed to the content tree as is: prefix stripping,
/// normalization and containment checks are the path resolver's job. An
/// encoded separator (`%2F`) decodes to a plain `/` and is treated like one.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Deref, Display)]
pub struct NodePath(pub String);

impl NodePath {
    /// Decodes a raw URI path.
    pub fn decode(raw: &str) -> Result<Self, Error<'static>> {
        let decoded = percent_decode_str(raw).decode_utf8().map_err(|err| {
            tracing::warn!(
                target: TRACING_TARGET,
                path = %raw,
                error = %err,
                "Rejected path that is not valid UTF-8"
            );
            ErrorKind::BadRequest
                .with_message("Path is not valid UTF-8 after percent-decoding")
                .with_context(err.to_string())
        })?;

        if decoded.contains('\0') {
            return Err(ErrorKind::BadRequest.with_message("Path contains a NUL byte"));
        }

        Ok(Self(decoded.into_owned()))
    }

    /// Returns the decoded path.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the inner path.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<S> FromRequestParts<S> for NodePath
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::decode(parts.uri.path())
    }
}
