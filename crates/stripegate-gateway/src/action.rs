//! The GET-object action state machine.
//!
//! One [`GetObjectAction`] services one request. The machine is an
//! explicit state enum: each handler consumes the awaited event (a
//! metadata lookup result, a read completion, a timer expiry) and returns
//! the next state, so the current position in the pipeline is always a
//! value, never inferred from which callback ran. State that only exists
//! once reading begins (the read plan, the backend reader, the
//! backpressure controller) is a record moved between handlers inside
//! the state value itself, not shared and not locked.
//!
//! The action owns the `reply_started` latch. It flips false→true exactly
//! once, when response headers go out, and is consulted on every terminal
//! path: before the latch, failures produce an XML error response; after
//! it, the only legal move is to end the reply.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use stripegate_engine::{
    BlockEngine, BlockReader, BucketStore, MemoryPool, ObjectStore, ReadBuffer, ReadError,
};
use stripegate_model::{LayoutTable, Lookup, ObjectRecord, S3ErrorKind};

use crate::blocks::{self, ReadPlan};
use crate::config::GatewayConfig;
use crate::context::RequestContext;
use crate::framer;
use crate::range;
use crate::reply::ClientReply;
use crate::shutdown::ShutdownSignal;
use crate::throttle::{BackpressureController, ThrottleDecision};

/// Shared environment for GET actions: the engine, the metadata stores,
/// the layout table, the buffer pool, configuration, and the process
/// shutdown signal. One `Gateway` serves many concurrent requests; each
/// request gets its own action with its own counters.
pub struct Gateway {
    engine: Arc<dyn BlockEngine>,
    buckets: Arc<dyn BucketStore>,
    objects: Arc<dyn ObjectStore>,
    layouts: Arc<LayoutTable>,
    pool: Arc<MemoryPool>,
    config: Arc<GatewayConfig>,
    shutdown: ShutdownSignal,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Assemble a gateway over its collaborators.
    #[must_use]
    pub fn new(
        engine: Arc<dyn BlockEngine>,
        buckets: Arc<dyn BucketStore>,
        objects: Arc<dyn ObjectStore>,
        layouts: Arc<LayoutTable>,
        pool: Arc<MemoryPool>,
        config: Arc<GatewayConfig>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            engine,
            buckets,
            objects,
            layouts,
            pool,
            config,
            shutdown,
        }
    }

    /// The process shutdown signal.
    #[must_use]
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// The gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run one GET-object request to completion, writing the response
    /// through `reply`.
    pub async fn get_object<R: ClientReply>(&self, ctx: RequestContext, reply: R) -> ActionOutcome {
        GetObjectAction::new(self, ctx, reply).run().await
    }
}

/// What one finished action did, for logs and tests.
#[derive(Debug)]
pub struct ActionOutcome {
    /// The request id.
    pub request_id: String,
    /// Body bytes forwarded to the client.
    pub bytes_sent: u64,
    /// Whether response headers were sent before the action finished.
    pub reply_started: bool,
    /// The failure recorded, if any. After headers this is log-only; it
    /// was never reported to the client.
    pub error: Option<S3ErrorKind>,
}

/// Everything the read loop owns once a plan is fixed. Moved between
/// handlers inside [`Step`]; dropped on any terminal transition, which
/// also releases an undelivered buffer back to the pool.
struct ReadState {
    record: ObjectRecord,
    plan: ReadPlan,
    reader: Box<dyn BlockReader>,
    throttle: BackpressureController,
}

/// The states of the pipeline. Each handler returns the next state;
/// `Complete` and `Abort` fall through to the single terminal branch,
/// which decides between a success close, an XML error, and a bare
/// reply-end based on the latch.
enum Step {
    FetchBucket,
    FetchObject,
    ValidateObject(ObjectRecord),
    ParseRange(ObjectRecord),
    ReadLoop(ReadState),
    /// Backpressure deferral: wait, then re-enter the read loop.
    Throttled(ReadState, Duration),
    /// A read completed; drain the buffer to the client.
    Streaming(ReadState, ReadBuffer),
    Complete,
    Abort,
}

/// One in-flight GET request.
struct GetObjectAction<'g, R: ClientReply> {
    gateway: &'g Gateway,
    ctx: RequestContext,
    reply: R,

    total_blocks_to_read: u64,
    blocks_already_read: u64,
    data_sent_to_client: u64,
    reply_started: bool,
    error: Option<S3ErrorKind>,
}

impl<'g, R: ClientReply> GetObjectAction<'g, R> {
    fn new(gateway: &'g Gateway, ctx: RequestContext, reply: R) -> Self {
        info!(
            request_id = %ctx.request_id,
            bucket = %ctx.bucket,
            key = %ctx.key,
            range = ?ctx.range_header,
            "GET object"
        );
        Self {
            gateway,
            ctx,
            reply,
            total_blocks_to_read: 0,
            blocks_already_read: 0,
            data_sent_to_client: 0,
            reply_started: false,
            error: None,
        }
    }

    /// Drive the machine until a terminal state, then send the terminal
    /// response. Runs exactly once per action.
    async fn run(mut self) -> ActionOutcome {
        let mut step = Step::FetchBucket;
        loop {
            step = match step {
                Step::FetchBucket => self.fetch_bucket().await,
                Step::FetchObject => self.fetch_object().await,
                Step::ValidateObject(record) => self.validate_object(record),
                Step::ParseRange(record) => self.parse_range(record),
                Step::ReadLoop(state) => self.read_loop(state).await,
                Step::Throttled(state, delay) => Self::throttled(state, delay).await,
                Step::Streaming(state, buffer) => self.stream_buffer(state, buffer),
                Step::Complete | Step::Abort => break,
            };
        }
        self.finish()
    }

    /// Record a failure and move to the terminal branch. The kind is
    /// reported to the client only if headers have not been sent.
    fn fail(&mut self, kind: S3ErrorKind) -> Step {
        self.error = Some(kind);
        Step::Abort
    }

    async fn fetch_bucket(&mut self) -> Step {
        match self.gateway.buckets.lookup_bucket(&self.ctx.bucket).await {
            Lookup::Present(_) => Step::FetchObject,
            Lookup::Missing => self.fail(S3ErrorKind::NoSuchBucket),
            Lookup::FailedToLaunch => {
                error!(
                    request_id = %self.ctx.request_id,
                    "bucket metadata lookup could not be launched"
                );
                self.fail(S3ErrorKind::ServiceUnavailable)
            }
            Lookup::Other => self.fail(S3ErrorKind::InternalError),
        }
    }

    async fn fetch_object(&mut self) -> Step {
        match self
            .gateway
            .objects
            .lookup_object(&self.ctx.bucket, &self.ctx.key)
            .await
        {
            Lookup::Present(record) => Step::ValidateObject(record),
            Lookup::Missing => self.fail(S3ErrorKind::NoSuchKey),
            Lookup::FailedToLaunch => {
                error!(
                    request_id = %self.ctx.request_id,
                    "object metadata lookup could not be launched"
                );
                self.fail(S3ErrorKind::ServiceUnavailable)
            }
            Lookup::Other => self.fail(S3ErrorKind::InternalError),
        }
    }

    /// Check the object record and short-circuit zero-length objects with
    /// a pure-header `200 OK`.
    fn validate_object(&mut self, record: ObjectRecord) -> Step {
        debug!(
            request_id = %self.ctx.request_id,
            content_length = record.content_length,
            layout_id = record.layout_id,
            "object metadata resolved"
        );

        framer::apply_tag_count(&mut self.reply, &record);

        if record.content_length == 0 {
            framer::start_zero_length_reply(&mut self.reply, &record);
            self.reply_started = true;
            return Step::Complete;
        }

        if self.gateway.layouts.get(record.layout_id).is_none() {
            error!(
                request_id = %self.ctx.request_id,
                layout_id = record.layout_id,
                "object references an unknown layout"
            );
            return self.fail(S3ErrorKind::InternalError);
        }

        Step::ParseRange(record)
    }

    /// Interpret the `Range` header, fix the read plan, and position a
    /// backend reader at the aligned start offset.
    fn parse_range(&mut self, record: ObjectRecord) -> Step {
        let Some(layout) = self.gateway.layouts.get(record.layout_id) else {
            return self.fail(S3ErrorKind::InternalError);
        };

        let byte_range =
            match range::parse_range(self.ctx.range_header.as_deref(), record.content_length) {
                Ok(byte_range) => byte_range,
                Err(parse_err) => {
                    info!(
                        request_id = %self.ctx.request_id,
                        range = ?self.ctx.range_header,
                        "rejecting range header"
                    );
                    return self.fail(parse_err.into());
                }
            };

        let plan = ReadPlan::new(record.content_length, layout.unit_size, byte_range);
        self.total_blocks_to_read = plan.total_blocks_to_read();
        debug!(
            request_id = %self.ctx.request_id,
            first_byte = plan.first_byte(),
            last_byte = plan.last_byte(),
            total_blocks_to_read = self.total_blocks_to_read,
            "read plan fixed"
        );

        let mut reader =
            self.gateway
                .engine
                .open_reader(record.object_id, record.layout_id, record.placement_id);
        reader.seek(plan.block_start_offset());

        let throttle = BackpressureController::new(
            layout.read_payload_size,
            self.gateway.config.write_buffer_multiple,
            self.gateway.config.pool_free_threshold,
            self.gateway.config.req_throttle_ms,
            Arc::clone(&self.gateway.pool),
        );

        Step::ReadLoop(ReadState {
            record,
            plan,
            reader,
            throttle,
        })
    }

    /// One turn of the adaptive read loop: shutdown check, backpressure
    /// check, read sizing, backend read.
    async fn read_loop(&mut self, mut state: ReadState) -> Step {
        if self.gateway.shutdown.is_quiescing() {
            return Step::Abort;
        }

        if let ThrottleDecision::Defer(delay) =
            state.throttle.check(self.reply.outstanding_write_bytes())
        {
            return Step::Throttled(state, delay);
        }

        let blocks = blocks::blocks_for_next_read(
            self.blocks_already_read,
            self.total_blocks_to_read,
            state.plan.requested_len(),
            state.plan.unit_size(),
            self.gateway.config.units_per_request,
            self.gateway.config.first_read_blocks,
        );
        if blocks == 0 {
            return Step::Complete;
        }
        debug!(
            request_id = %self.ctx.request_id,
            blocks,
            blocks_already_read = self.blocks_already_read,
            total_blocks_to_read = self.total_blocks_to_read,
            "issuing backend read"
        );

        match state.reader.read(blocks).await {
            Ok(buffer) => {
                self.blocks_already_read += blocks;
                Step::Streaming(state, buffer)
            }
            Err(ReadError::FailedToLaunch) => {
                error!(
                    request_id = %self.ctx.request_id,
                    "backend read could not be launched"
                );
                self.fail(S3ErrorKind::ServiceUnavailable)
            }
            Err(ReadError::Failed(reason)) => {
                error!(request_id = %self.ctx.request_id, %reason, "backend read failed");
                self.fail(S3ErrorKind::InternalError)
            }
        }
    }

    /// Cooperative deferral; expiry re-enters the read loop unchanged.
    async fn throttled(state: ReadState, delay: Duration) -> Step {
        tokio::time::sleep(delay).await;
        Step::ReadLoop(state)
    }

    /// Deliver one buffer: open the reply on the first, slice the buffer
    /// to the requested window, and hand it to the transport.
    #[allow(clippy::cast_possible_truncation)] // offsets fit usize on 64-bit targets
    fn stream_buffer(&mut self, state: ReadState, mut buffer: ReadBuffer) -> Step {
        if self.gateway.shutdown.is_quiescing() {
            // The in-flight read completed during quiesce; discard it.
            return Step::Abort;
        }

        if !self.reply_started {
            framer::start_streaming_reply(&mut self.reply, &state.record, &state.plan);
            self.reply_started = true;
        }

        // The first delivered buffer starts at the aligned block boundary;
        // drop the bytes before the requested first byte.
        if self.data_sent_to_client == 0 {
            let discard = state.plan.leading_discard();
            if discard > 0 {
                buffer.drain_front(discard as usize);
            }
        }

        let requested = state.plan.requested_len();
        if self.data_sent_to_client + buffer.len() as u64 >= requested {
            buffer.trim_to((requested - self.data_sent_to_client) as usize);
        }

        self.data_sent_to_client += buffer.len() as u64;
        debug!(
            request_id = %self.ctx.request_id,
            chunk = buffer.len(),
            data_sent_to_client = self.data_sent_to_client,
            pool_in_use = self.gateway.pool.in_use(),
            pool_capacity = self.gateway.pool.capacity(),
            "forwarding chunk to client"
        );
        self.reply.send_body(buffer);

        if !self.reply.client_connected() {
            info!(request_id = %self.ctx.request_id, "client disconnected, aborting GET");
            return self.fail(S3ErrorKind::InternalError);
        }

        if self.data_sent_to_client == requested {
            Step::Complete
        } else {
            Step::ReadLoop(state)
        }
    }

    /// The single terminal branch. Consults the quiesce flag and the
    /// `reply_started` latch immediately before sending anything, and
    /// completes the action exactly once.
    fn finish(mut self) -> ActionOutcome {
        if self.gateway.shutdown.is_quiescing() {
            if self.reply_started {
                self.reply.end();
            } else {
                framer::send_error_reply(
                    &mut self.reply,
                    S3ErrorKind::ServiceUnavailable,
                    &self.ctx,
                    self.gateway.config.retry_after_secs,
                );
            }
        } else if let Some(kind) = self.error {
            if self.reply_started {
                // Bytes are already on the wire; the failure can no longer
                // be reported. End the reply and keep the record in logs.
                error!(
                    request_id = %self.ctx.request_id,
                    error = %kind,
                    data_sent_to_client = self.data_sent_to_client,
                    "GET failed after headers were sent, ending reply"
                );
                self.reply.end();
            } else {
                error!(
                    request_id = %self.ctx.request_id,
                    error = %kind,
                    status = %kind.status_code(),
                    "GET failed"
                );
                framer::send_error_reply(&mut self.reply, kind, &self.ctx, 1);
            }
        } else if self.reply_started {
            info!(
                request_id = %self.ctx.request_id,
                bytes_sent = self.data_sent_to_client,
                "GET complete"
            );
            self.reply.end();
        } else {
            // Terminal without an error or a started reply: inconsistent.
            error!(request_id = %self.ctx.request_id, "GET finished in an inconsistent state");
            self.error = Some(S3ErrorKind::InternalError);
            framer::send_error_reply(&mut self.reply, S3ErrorKind::InternalError, &self.ctx, 1);
        }

        ActionOutcome {
            request_id: self.ctx.request_id,
            bytes_sent: self.data_sent_to_client,
            reply_started: self.reply_started,
            error: self.error,
        }
    }
}
