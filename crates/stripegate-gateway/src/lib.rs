//! The streaming GET-object pipeline of the stripegate gateway.
//!
//! Given an authenticated GET request for an object stored as fixed-size
//! stripe units, the pipeline resolves bucket and object metadata,
//! interprets any `Range` header, fetches object data in bounded chunks
//! from the block engine, and streams the result to the client while
//! honoring memory pressure and shutdown signals.
//!
//! The center is [`action::GetObjectAction`]: an explicit state machine
//! that sequences metadata lookups and reads, owns the once-only
//! "reply started" latch, and drives the adaptive read loop. The other
//! modules are its parts: the `Range` parser ([`range`]), the stripe-unit
//! arithmetic ([`blocks`]), the backpressure controller ([`throttle`]),
//! the response framer ([`framer`]), the transport seam ([`reply`]), and
//! the cooperative shutdown flag ([`shutdown`]).

pub mod action;
pub mod blocks;
pub mod config;
pub mod context;
pub mod framer;
pub mod range;
pub mod reply;
pub mod shutdown;
pub mod throttle;

pub use action::{ActionOutcome, Gateway};
pub use config::GatewayConfig;
pub use context::RequestContext;
pub use reply::ClientReply;
pub use shutdown::ShutdownSignal;
