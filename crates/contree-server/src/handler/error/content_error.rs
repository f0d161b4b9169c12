//! Content tree error to HTTP error conversion.

use contree_core::ErrorKind as ContentErrorKind;

use super::http_error::{Error as HttpError, ErrorKind, Result};
use crate::handler::response::ValidationErrorDetail;

/// Tracing target for content tree error conversions.
const TRACING_TARGET: &str = "contree_server::handler::content";

impl From<contree_core::Error> for HttpError<'static> {
    fn from(error: contree_core::Error) -> Self {
        match error.kind() {
            ContentErrorKind::Forbidden => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Rejected path outside the content root"
                );
                ErrorKind::Forbidden.with_message("Path escapes the content root")
            }
            ContentErrorKind::NotFound => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Node not found"
                );
                ErrorKind::NotFound.with_message(error.message().to_owned())
            }
            ContentErrorKind::Validation => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Rejected invalid request"
                );

                match error.violation() {
                    Some(violation) => ErrorKind::ValidationError
                        .with_message(violation.to_string())
                        .with_validation(ValidationErrorDetail::from(violation)),
                    None => ErrorKind::BadRequest.with_message(error.message().to_owned()),
                }
            }
            ContentErrorKind::Parse => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Stored metadata is not valid JSON"
                );
                ErrorKind::UnprocessableEntity
                    .with_message(error.message().to_owned())
                    .with_suggestion("Restore the metadata from a backup")
            }
            ContentErrorKind::Conflict => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Write conflicts with an existing entry"
                );
                ErrorKind::Conflict.with_message(error.message().to_owned())
            }
            ContentErrorKind::Internal => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    source = ?std::error::Error::source(&error),
                    "Content tree operation failed"
                );
                ErrorKind::InternalServerError.with_context(error.to_string())
            }
        }
    }
}

/// Converts content tree results into handler results tagged with the request path.
pub trait ContentResultExt<T> {
    /// Maps the error and records `path` as its resource.
    fn with_resource(self, path: &str) -> Result<T>;
}

impl<T> ContentResultExt<T> for contree_core::Result<T> {
    fn with_resource(self, path: &str) -> Result<T> {
        self.map_err(|error| HttpError::from(error).with_resource(path.to_owned()))
    }
}
