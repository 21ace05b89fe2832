#![doc(html_root_url = "https://docs.rs/oversend/latest")]
//! Public API for the `oversend` library.
//!
//! This crate lets message producers recover transparently when a transport
//! rejects a message for exceeding its payload limit. Outgoing sends and
//! inbound processing cycles are wrapped by interceptors that adjust an
//! oversized message, using an application-supplied policy, and retry at
//! most once.

pub mod adjust;
pub mod classify;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod message;
pub mod metrics;
pub mod middleware;
pub mod panic;
pub mod receive;
pub mod send;
pub mod transport;

pub use adjust::{Adjust, AdjustmentPolicy, Truncate, typed};
pub use classify::{Oversize, is_too_large};
pub use config::AdjustmentConfig;
pub use context::{CycleId, ProcessingContext};
pub use endpoint::{Endpoint, EndpointBuilder};
pub use envelope::{Envelope, MessageKind};
pub use error::{AdjustError, HandlerError, RouteError, SendError};
pub use receive::{CycleState, CycleSummary, Handler, Outbox, ReceiveInterceptor, handler};
pub use send::SendPipeline;
pub use transport::{MemoryTransport, SendOutcome, Transport, TransportError};
