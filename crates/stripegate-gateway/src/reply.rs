//! The transport seam the action writes through.
//!
//! [`ClientReply`] abstracts one HTTP response in flight: header staging,
//! the once-only transition from "no response yet" to "headers sent",
//! body chunk handoff, and the flow-control introspection the
//! backpressure controller needs. The hyper implementation lives in
//! `stripegate-http`; tests use a recording implementation.

use http::StatusCode;
use stripegate_engine::ReadBuffer;

/// One in-flight HTTP response.
///
/// The action calls methods in one of two shapes:
///
/// - streaming: any number of `set_header`, then `start` exactly once,
///   then zero or more `send_body`, then `end`;
/// - one-shot: any number of `set_header`, then `respond` exactly once
///   (used for error bodies and never after `start`).
pub trait ClientReply: Send {
    /// Stage a response header. No effect after `start` or `respond`.
    fn set_header(&mut self, name: &str, value: &str);

    /// Send the status line and staged headers. Called at most once.
    fn start(&mut self, status: StatusCode);

    /// Hand a body chunk to the transport. The buffer's pool lease moves
    /// with it and is returned once the bytes are written out.
    fn send_body(&mut self, chunk: ReadBuffer);

    /// Finish the response body. After `end` the response is complete; a
    /// response ended before `requested_len` bytes were sent surfaces to
    /// the client as a truncated body.
    fn end(&mut self);

    /// Send a complete response in one call: status, staged headers, body.
    fn respond(&mut self, status: StatusCode, body: Vec<u8>);

    /// Bytes accepted by `send_body` but not yet written to the socket.
    fn outstanding_write_bytes(&self) -> u64;

    /// Whether the peer is still reading the response.
    fn client_connected(&self) -> bool;
}
