//! hyper transport for the stripegate gateway.
//!
//! [`body::ReplyBody`] is the response body type: buffered for XML error
//! payloads, streaming for object data, empty for pure-header replies.
//! [`reply::HyperReply`] adapts one in-flight response to the gateway's
//! `ClientReply` seam, including the outstanding-write accounting the
//! backpressure controller reads. [`service::GatewayHttpService`] is the
//! hyper `Service` that routes GET-object requests into the gateway.

pub mod body;
pub mod reply;
pub mod service;

pub use body::ReplyBody;
pub use reply::HyperReply;
pub use service::GatewayHttpService;
