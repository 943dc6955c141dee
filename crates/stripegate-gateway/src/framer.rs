//! Response framing.
//!
//! Builds the two success shapes a GET can take (the pure-header reply
//! for zero-length objects and the streaming reply) and the XML error
//! reply used when no bytes have been sent yet. The ETag always carries
//! literal double quotes, and `Content-Length` on ranged responses is the
//! requested slice length, not the object size.

use http::StatusCode;
use tracing::debug;

use stripegate_model::{ObjectRecord, S3Error, S3ErrorKind};

use crate::blocks::ReadPlan;
use crate::context::RequestContext;
use crate::reply::ClientReply;

/// Echo the tag count header when the object carries tags.
pub fn apply_tag_count(reply: &mut dyn ClientReply, record: &ObjectRecord) {
    if record.has_tags() {
        reply.set_header("x-amz-tagging-count", &record.tag_count.to_string());
    }
}

/// Stage user attributes as response headers, in stored order.
fn apply_user_attributes(reply: &mut dyn ClientReply, record: &ObjectRecord) {
    for (name, value) in &record.user_attributes {
        reply.set_header(name, value);
    }
}

/// Open the pure-header `200 OK` reply for a zero-length object. The
/// caller ends the reply on its terminal path.
pub fn start_zero_length_reply(reply: &mut dyn ClientReply, record: &ObjectRecord) {
    reply.set_header("Last-Modified", &record.last_modified_http());
    reply.set_header("ETag", &record.etag());
    reply.set_header("Accept-Ranges", "bytes");
    reply.set_header("Content-Type", &record.content_type);
    reply.set_header("Content-Length", "0");
    apply_user_attributes(reply, record);
    reply.start(StatusCode::OK);
}

/// Open the streaming reply: `206 Partial Content` with `Content-Range`
/// for ranged reads, `200 OK` otherwise.
pub fn start_streaming_reply(reply: &mut dyn ClientReply, record: &ObjectRecord, plan: &ReadPlan) {
    reply.set_header("Last-Modified", &record.last_modified_http());
    reply.set_header("Content-Type", &record.content_type);
    reply.set_header("ETag", &record.etag());
    reply.set_header("Accept-Ranges", "bytes");
    reply.set_header("Content-Length", &plan.requested_len().to_string());
    apply_user_attributes(reply, record);

    if plan.is_partial() {
        reply.set_header("Content-Range", &plan.content_range());
        reply.start(StatusCode::PARTIAL_CONTENT);
    } else {
        reply.start(StatusCode::OK);
    }
    debug!(
        partial = plan.is_partial(),
        content_length = plan.requested_len(),
        "opened streaming reply"
    );
}

/// Send an XML error reply. Only valid before `start`; the action's latch
/// guarantees that. `retry_after_secs` is used for retryable kinds only.
pub fn send_error_reply(
    reply: &mut dyn ClientReply,
    kind: S3ErrorKind,
    ctx: &RequestContext,
    retry_after_secs: u64,
) {
    let err = S3Error::new(kind, ctx.object_uri(), ctx.request_id.clone());
    let body = stripegate_xml::error_to_xml(err.kind.as_str(), &err.request_id, &err.resource);
    reply.set_header("Content-Type", "application/xml");
    reply.set_header("Content-Length", &body.len().to_string());
    if err.kind.is_retryable() {
        reply.set_header("Retry-After", &retry_after_secs.to_string());
    }
    reply.respond(err.status_code(), body);
}
