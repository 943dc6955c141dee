//! The hyper-backed reply handle.
//!
//! [`HyperReply`] is the gateway's view of one in-flight HTTP response.
//! The response head travels over a oneshot channel to the service future
//! the moment `start` (or `respond`) is called; body chunks then flow
//! through the streaming body. Outstanding-write accounting is shared
//! with the body so the backpressure controller can see how far the
//! action has run ahead of the socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http::header::HeaderValue;
use http::StatusCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use stripegate_engine::ReadBuffer;
use stripegate_gateway::ClientReply;

use crate::body::{ReplyBody, StreamChunk};

/// One in-flight HTTP response, adapting hyper to the gateway's
/// `ClientReply` seam.
#[derive(Debug)]
pub struct HyperReply {
    headers: Vec<(String, String)>,
    head_tx: Option<oneshot::Sender<http::Response<ReplyBody>>>,
    body_tx: Option<mpsc::UnboundedSender<StreamChunk>>,
    outstanding: Arc<AtomicU64>,
    started: bool,
}

impl HyperReply {
    /// Create a reply handle and the receiver the service future awaits
    /// for the response head.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<http::Response<ReplyBody>>) {
        let (head_tx, head_rx) = oneshot::channel();
        (
            Self {
                headers: Vec::new(),
                head_tx: Some(head_tx),
                body_tx: None,
                outstanding: Arc::new(AtomicU64::new(0)),
                started: false,
            },
            head_rx,
        )
    }

    /// Build a response from the staged headers, skipping values that are
    /// not valid header values.
    fn build_head(&self, status: StatusCode, body: ReplyBody) -> http::Response<ReplyBody> {
        let mut builder = http::Response::builder().status(status);
        for (name, value) in &self.headers {
            if let Ok(hv) = HeaderValue::from_str(value) {
                builder = builder.header(name.as_str(), hv);
            } else {
                warn!(header = %name, "dropping invalid response header value");
            }
        }
        builder.body(body).unwrap_or_else(|e| {
            warn!(error = %e, "failed to build response head");
            http::Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(ReplyBody::empty())
                .expect("static response should be valid")
        })
    }
}

impl ClientReply for HyperReply {
    fn set_header(&mut self, name: &str, value: &str) {
        if !self.started {
            self.headers.push((name.to_owned(), value.to_owned()));
        }
    }

    fn start(&mut self, status: StatusCode) {
        let Some(head_tx) = self.head_tx.take() else {
            warn!("reply already started, ignoring start");
            return;
        };
        let (body_tx, body_rx) = mpsc::unbounded_channel();
        let body = ReplyBody::Streaming {
            rx: body_rx,
            outstanding: Arc::clone(&self.outstanding),
        };
        let response = self.build_head(status, body);
        self.started = true;
        self.body_tx = Some(body_tx);
        if head_tx.send(response).is_err() {
            // The service future is gone; the connection dropped before
            // headers went out. Chunk sends will fail and the action will
            // observe the disconnect.
            debug!("response head receiver dropped before start");
            self.body_tx = None;
        }
    }

    fn send_body(&mut self, chunk: ReadBuffer) {
        let Some(body_tx) = &self.body_tx else {
            // Dropping the chunk returns its lease to the pool.
            return;
        };
        let (bytes, lease) = chunk.release();
        self.outstanding.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        let len = bytes.len() as u64;
        if body_tx
            .send(StreamChunk {
                bytes,
                lease: Some(lease),
            })
            .is_err()
        {
            // Receiver gone: undo the accounting; the failed send dropped
            // the chunk and its lease.
            self.outstanding.fetch_sub(len, Ordering::Relaxed);
        }
    }

    fn end(&mut self) {
        // Dropping the sender ends the streaming body; for one-shot
        // replies there is nothing to do.
        self.body_tx = None;
    }

    fn respond(&mut self, status: StatusCode, body: Vec<u8>) {
        let Some(head_tx) = self.head_tx.take() else {
            warn!("reply already started, ignoring respond");
            return;
        };
        let response = self.build_head(status, ReplyBody::from_bytes(body));
        self.started = true;
        if head_tx.send(response).is_err() {
            debug!("response head receiver dropped before respond");
        }
    }

    fn outstanding_write_bytes(&self) -> u64 {
        self.outstanding.load(Ordering::Relaxed)
    }

    fn client_connected(&self) -> bool {
        match &self.body_tx {
            Some(body_tx) => !body_tx.is_closed(),
            // Before the body exists the connection is only observable via
            // the head channel.
            None => self.head_tx.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use stripegate_engine::MemoryPool;

    use super::*;

    fn chunk_of(data: &'static [u8]) -> (std::sync::Arc<MemoryPool>, ReadBuffer) {
        let pool = MemoryPool::new(1 << 20);
        let lease = pool.reserve(data.len() as u64);
        (pool.clone(), ReadBuffer::new(Bytes::from_static(data), lease))
    }

    #[tokio::test]
    async fn test_should_deliver_head_and_streamed_body() {
        let (mut reply, head_rx) = HyperReply::channel();
        reply.set_header("Content-Type", "text/plain");
        reply.set_header("Content-Length", "11");
        reply.start(StatusCode::OK);

        let (pool, chunk) = chunk_of(b"hello world");
        reply.send_body(chunk);
        reply.end();

        let response = head_rx.await.expect("head");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        let body = response.into_body().collect().await.expect("body").to_bytes();
        assert_eq!(body.as_ref(), b"hello world");
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn test_should_account_outstanding_bytes_until_polled() {
        let (mut reply, head_rx) = HyperReply::channel();
        reply.start(StatusCode::OK);

        let (_pool, chunk) = chunk_of(b"0123456789");
        reply.send_body(chunk);
        assert_eq!(reply.outstanding_write_bytes(), 10);

        reply.end();
        let response = head_rx.await.expect("head");
        let _ = response.into_body().collect().await.expect("body");
        assert_eq!(reply.outstanding_write_bytes(), 0);
    }

    #[tokio::test]
    async fn test_should_deliver_oneshot_response() {
        let (mut reply, head_rx) = HyperReply::channel();
        reply.set_header("Content-Type", "application/xml");
        reply.respond(StatusCode::NOT_FOUND, b"<Error/>".to_vec());

        let response = head_rx.await.expect("head");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.expect("body").to_bytes();
        assert_eq!(body.as_ref(), b"<Error/>");
    }

    #[tokio::test]
    async fn test_should_ignore_second_start() {
        let (mut reply, head_rx) = HyperReply::channel();
        reply.start(StatusCode::OK);
        reply.start(StatusCode::INTERNAL_SERVER_ERROR);
        reply.end();

        let response = head_rx.await.expect("head");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_observe_disconnect_and_release_chunks() {
        let (mut reply, head_rx) = HyperReply::channel();
        reply.start(StatusCode::OK);
        assert!(reply.client_connected());

        // Dropping the response drops the body receiver.
        drop(head_rx.await.expect("head"));
        assert!(!reply.client_connected());

        let (pool, chunk) = chunk_of(b"late");
        reply.send_body(chunk);
        assert_eq!(reply.outstanding_write_bytes(), 0);
        assert_eq!(pool.in_use(), 0);
    }
}
