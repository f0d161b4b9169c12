//! Raw body extractor with improved error handling.

use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use bytes::Bytes;
use derive_more::{Deref, From};

use super::enhanced_json::sanitize_error_message;
use crate::handler::{Error, ErrorKind};

/// The buffered request body.
///
/// Buffering honours the router's [`DefaultBodyLimit`]; a body over the limit
/// is rejected with `413`.
///
/// [`DefaultBodyLimit`]: axum::extract::DefaultBodyLimit
#[must_use]
#[derive(Debug, Clone, Default, Deref, From)]
pub struct Payload(pub Bytes);

impl Payload {
    /// Returns the body bytes.
    #[inline]
    pub fn into_inner(self) -> Bytes {
        self.0
    }
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extractor = <Bytes as FromRequest<S>>::from_request(req, state).await;
        extractor.map(Self).map_err(Into::into)
    }
}

impl From<BytesRejection> for Error<'static> {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ErrorKind::PayloadTooLarge.with_context(rejection.body_text());
        }

        ErrorKind::BadRequest
            .with_message("Failed to read request body")
            .with_context(sanitize_error_message(&rejection.body_text()))
    }
}
