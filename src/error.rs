//! Error types produced by the send pipeline, the receive interceptor and
//! endpoint configuration.
//!
//! Failures this crate does not handle itself are wrapped without alteration
//! so callers always see the transport's or handler's original error.

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

use crate::{envelope::MessageKind, transport::TransportError};

/// Boxed error type used for opaque application and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while producing an adjusted payload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdjustError {
    /// The payload could not be decoded as the expected message type.
    #[error("failed to decode payload for adjustment: {0}")]
    Decode(#[from] DecodeError),
    /// The adjusted message could not be encoded.
    #[error("failed to encode adjusted payload: {0}")]
    Encode(#[from] EncodeError),
    /// The adjustment function refused to shrink this payload.
    #[error("adjustment rejected: {0}")]
    Rejected(String),
}

/// Errors returned when sending through the pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SendError {
    /// The transport refused the message. Size rejections that no
    /// interceptor recovered from also surface here.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The adjusted payload was still rejected as too large.
    #[error("adjusted {kind} payload of {size} bytes was still rejected: {source}")]
    AdjustmentExhausted {
        /// Kind of the rejected message.
        kind: MessageKind,
        /// Size of the adjusted payload.
        size: usize,
        /// Rejection reported for the adjusted payload.
        #[source]
        source: TransportError,
    },
    /// The adjustment function failed.
    #[error("failed to adjust {kind} payload: {source}")]
    Adjust {
        /// Kind of the message being adjusted.
        kind: MessageKind,
        #[source]
        source: AdjustError,
    },
}

impl SendError {
    pub(crate) fn exhausted(kind: MessageKind, size: usize, error: SendError) -> Self {
        match error {
            Self::Transport(source) => Self::AdjustmentExhausted { kind, size, source },
            other => other,
        }
    }
}

/// Errors returned by a message handler or the processing cycle around it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// A send issued by the handler failed.
    #[error(transparent)]
    Send(#[from] SendError),
    /// Application-defined failure raised by the handler body.
    #[error("handler failed: {0}")]
    Application(#[source] BoxError),
    /// No handler is registered for the inbound message kind.
    #[error("no handler registered for message kind {0}")]
    NoRoute(MessageKind),
}

impl HandlerError {
    /// Wrap an application error.
    pub fn application(error: impl Into<BoxError>) -> Self { Self::Application(error.into()) }
}

/// Errors raised while configuring an endpoint.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RouteError {
    /// A handler for this kind was already registered.
    #[error("a handler for message kind {0} was already registered")]
    DuplicateRoute(MessageKind),
}
