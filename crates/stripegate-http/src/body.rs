//! Response body types supporting buffered, streaming, and empty modes.
//!
//! Buffered bodies carry small payloads (XML errors, health JSON).
//! Streaming bodies carry object data chunk by chunk: the action pushes
//! [`StreamChunk`]s into an unbounded channel, and each chunk's pool lease
//! is returned when hyper takes the frame. The channel is unbounded on
//! purpose: the backpressure controller bounds how far the action runs
//! ahead of the socket, so the transport never needs to block it.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;
use tokio::sync::mpsc;

use stripegate_engine::PoolLease;

/// One body chunk in flight between the action and the socket.
#[derive(Debug)]
pub struct StreamChunk {
    /// The chunk bytes.
    pub bytes: Bytes,
    /// The pool lease accounting for them, returned when the chunk is
    /// handed to hyper.
    pub lease: Option<PoolLease>,
}

/// Response body for the gateway's HTTP service.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper
/// responses.
#[derive(Debug)]
pub enum ReplyBody {
    /// Buffered body for small responses: XML error payloads, health JSON.
    Buffered(Full<Bytes>),
    /// Streaming object data.
    Streaming {
        /// Chunks pushed by the action.
        rx: mpsc::UnboundedReceiver<StreamChunk>,
        /// Bytes accepted but not yet handed to hyper; shared with the
        /// reply handle for flow-control introspection.
        outstanding: Arc<AtomicU64>,
    },
    /// Empty body for pure-header responses.
    Empty,
}

impl Default for ReplyBody {
    fn default() -> Self {
        Self::Empty
    }
}

impl ReplyBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl http_body::Body for ReplyBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming { rx, outstanding } => match rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => {
                    outstanding.fetch_sub(chunk.bytes.len() as u64, Ordering::Relaxed);
                    // The lease drops here: the bytes now belong to hyper.
                    drop(chunk.lease);
                    Poll::Ready(Some(Ok(http_body::Frame::data(chunk.bytes))))
                }
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming { .. } => false,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming { .. } => http_body::SizeHint::default(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body::Body;
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn test_should_report_empty_body_as_end_of_stream() {
        let body = ReplyBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }

    #[test]
    fn test_should_create_buffered_body_from_bytes() {
        let body = ReplyBody::from_bytes(Bytes::from("hello"));
        assert!(!body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(5));
    }

    #[tokio::test]
    async fn test_should_stream_chunks_in_order_and_settle_accounting() {
        let (tx, rx) = mpsc::unbounded_channel();
        let outstanding = Arc::new(AtomicU64::new(0));
        let body = ReplyBody::Streaming {
            rx,
            outstanding: Arc::clone(&outstanding),
        };

        for part in [&b"hello "[..], &b"world"[..]] {
            outstanding.fetch_add(part.len() as u64, Ordering::Relaxed);
            tx.send(StreamChunk {
                bytes: Bytes::from_static(part),
                lease: None,
            })
            .expect("send");
        }
        drop(tx);

        let collected = body.collect().await.expect("collect").to_bytes();
        assert_eq!(collected.as_ref(), b"hello world");
        assert_eq!(outstanding.load(Ordering::Relaxed), 0);
    }
}
