//! Per-request context.

use uuid::Uuid;

/// Identity and inputs of one GET-object request.
///
/// Created by the transport once routing has resolved a bucket and key,
/// and owned by the action for the lifetime of the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique id attached to every log line and error body.
    pub request_id: String,
    /// The bucket name from the request path.
    pub bucket: String,
    /// The object key from the request path.
    pub key: String,
    /// Raw `Range` header value, if the request carried one.
    pub range_header: Option<String>,
}

impl RequestContext {
    /// Create a context with a fresh request id.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, range_header: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().simple().to_string(),
            bucket: bucket.into(),
            key: key.into(),
            range_header,
        }
    }

    /// The object URI reported as `Resource` in error bodies.
    #[must_use]
    pub fn object_uri(&self) -> String {
        format!("/{}/{}", self.bucket, self.key)
    }
}
