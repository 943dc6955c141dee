//! The error taxonomy the GET pipeline reports to clients.
//!
//! Failures inside the pipeline collapse into a small set of well-known S3
//! error codes. Each [`S3ErrorKind`] maps to a fixed HTTP status; an
//! [`S3Error`] value additionally carries the request id and the resource
//! (object URI) that the XML error body echoes back to the client.
//!
//! Failures that occur after response headers have been written cannot be
//! reported at all. That case never constructs an [`S3Error`]; the action
//! simply ends the reply. See the gateway's action module.

use std::fmt;

/// Failure categories a GET-object request can surface to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S3ErrorKind {
    /// The named bucket does not exist.
    NoSuchBucket,
    /// The named object does not exist in the bucket.
    NoSuchKey,
    /// The `Range` header was malformed or unsatisfiable.
    InvalidRange,
    /// The backend could not launch the operation, or the process is
    /// quiescing. Responses carry a `Retry-After` header.
    ServiceUnavailable,
    /// Catch-all for metadata failures, backend read failures before any
    /// bytes were sent, and client disconnects.
    InternalError,
}

impl S3ErrorKind {
    /// The S3 error code string used in the XML body.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::InvalidRange => "InvalidRange",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::InternalError => "InternalError",
        }
    }

    /// The fixed HTTP status for this error code.
    #[must_use]
    pub fn status_code(self) -> http::StatusCode {
        match self {
            Self::NoSuchBucket | Self::NoSuchKey => http::StatusCode::NOT_FOUND,
            Self::InvalidRange => http::StatusCode::RANGE_NOT_SATISFIABLE,
            Self::ServiceUnavailable => http::StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether responses for this kind carry a `Retry-After` header.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }
}

impl fmt::Display for S3ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reportable error: the kind plus the request context echoed in the XML
/// body (`<Error><Code/><RequestId/><Resource/></Error>`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {resource}")]
pub struct S3Error {
    /// The failure category.
    pub kind: S3ErrorKind,
    /// The object URI (`/{bucket}/{key}`) the request addressed.
    pub resource: String,
    /// The id assigned to this request.
    pub request_id: String,
}

impl S3Error {
    /// Create an error for the given kind and request context.
    #[must_use]
    pub fn new(kind: S3ErrorKind, resource: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
            request_id: request_id.into(),
        }
    }

    /// The HTTP status this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        self.kind.status_code()
    }
}
