//! Engine error type definitions.

use std::borrow::Cow;
use std::{fmt, io};

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

use crate::node::NodeViolation;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with the engine [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur in content tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The resolved path escapes the content root.
    Forbidden,
    /// The target of a read or delete does not exist.
    NotFound,
    /// A request body or node document is malformed or schema-invalid.
    Validation,
    /// A sidecar or backup on disk is not valid JSON.
    Parse,
    /// The write collides with an existing entry of another kind.
    Conflict,
    /// Unexpected I/O or configuration failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A structured error type for content tree operations.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    violation: Option<NodeViolation>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            violation: None,
            source: None,
        }
    }

    /// Creates a new forbidden error.
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Creates a new not found error.
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates a new parse error.
    pub fn parse(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    /// Creates a new conflict error.
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Wraps an I/O error, mapping a missing entry to [`ErrorKind::NotFound`].
    pub fn io(message: impl Into<Cow<'static, str>>, source: io::Error) -> Self {
        let kind = match source.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        };

        Self::new(kind, message).with_source(source)
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the violated node constraint for validation errors.
    pub fn violation(&self) -> Option<&NodeViolation> {
        self.violation.as_ref()
    }
}

impl From<NodeViolation> for Error {
    fn from(violation: NodeViolation) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: Cow::Owned(violation.to_string()),
            violation: Some(violation),
            source: None,
        }
    }
}
