//! The transport boundary consumed by the send pipeline.
//!
//! A [`Transport`] accepts one [`Envelope`] at a time and reports whether it
//! was delivered. Rejections caused by the transport's payload limit are
//! reported as [`TransportError::TooLarge`] so interceptors can tell them
//! apart from every other failure.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{envelope::Envelope, error::BoxError};

/// Default payload limit used by [`MemoryTransport`]: 256 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 256 * 1024;

/// Number of attempts [`MemoryTransport`] retains by default.
pub const DEFAULT_HISTORY: usize = 1024;

/// Failure reported by a transport for a single send.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The payload exceeds the transport's size limit.
    #[error("payload of {size} bytes exceeds the transport limit of {limit} bytes")]
    TooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Largest payload the transport accepts.
        limit: usize,
    },
    /// Any other failure (network, authorisation, closed channel, ...).
    #[error("transport failure: {0}")]
    Other(#[source] BoxError),
}

impl TransportError {
    /// Wrap an arbitrary error as a non-size transport failure.
    pub fn other(error: impl Into<BoxError>) -> Self { Self::Other(error.into()) }
}

/// Result of a single send: `Ok(())` means the message was delivered.
pub type SendOutcome = Result<(), TransportError>;

/// A message transport with a maximum payload size.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Attempt to deliver `envelope`.
    async fn send(&self, envelope: Envelope) -> SendOutcome;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, envelope: Envelope) -> SendOutcome { (**self).send(envelope).await }
}

/// Record of one call to [`MemoryTransport::send`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendAttempt {
    /// The envelope handed to the transport.
    pub envelope: Envelope,
    /// Whether the transport accepted it.
    pub delivered: bool,
}

/// In-process transport enforcing a payload limit.
///
/// The most recent attempts are kept for inspection, [`DEFAULT_HISTORY`]
/// unless changed with [`MemoryTransport::with_history`]; older ones are
/// discarded. When a loopback channel is configured,
/// delivered envelopes are forwarded to it so an [`Endpoint`] can receive
/// the messages it sends to itself.
///
/// [`Endpoint`]: crate::endpoint::Endpoint
///
/// # Examples
///
/// ```
/// use oversend::{
///     envelope::Envelope,
///     transport::{MemoryTransport, Transport, TransportError},
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = MemoryTransport::new(4);
/// assert!(transport.send(Envelope::new("small", vec![0; 4])).await.is_ok());
/// assert!(matches!(
///     transport.send(Envelope::new("big", vec![0; 5])).await,
///     Err(TransportError::TooLarge { size: 5, limit: 4 })
/// ));
/// assert_eq!(transport.delivered().len(), 1);
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    max_payload: usize,
    history: usize,
    attempts: Mutex<VecDeque<SendAttempt>>,
    loopback: Option<mpsc::UnboundedSender<Envelope>>,
}

impl Default for MemoryTransport {
    fn default() -> Self { Self::new(DEFAULT_MAX_PAYLOAD) }
}

impl MemoryTransport {
    /// Create a transport rejecting payloads larger than `max_payload` bytes.
    #[must_use]
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload,
            history: DEFAULT_HISTORY,
            attempts: Mutex::new(VecDeque::new()),
            loopback: None,
        }
    }

    /// Forward delivered envelopes to `tx`.
    #[must_use]
    pub fn with_loopback(mut self, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        self.loopback = Some(tx);
        self
    }

    /// Retain at most `history` attempts. Zero disables recording.
    #[must_use]
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn max_payload(&self) -> usize { self.max_payload }

    /// The retained envelopes handed to [`Transport::send`], in call order.
    #[must_use]
    pub fn attempts(&self) -> Vec<SendAttempt> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Envelopes that were accepted, in delivery order.
    #[must_use]
    pub fn delivered(&self) -> Vec<Envelope> {
        self.attempts()
            .into_iter()
            .filter(|attempt| attempt.delivered)
            .map(|attempt| attempt.envelope)
            .collect()
    }

    fn record(&self, envelope: Envelope, delivered: bool) {
        if self.history == 0 {
            return;
        }
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        if attempts.len() == self.history {
            attempts.pop_front();
        }
        attempts.push_back(SendAttempt {
            envelope,
            delivered,
        });
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, envelope: Envelope) -> SendOutcome {
        let size = envelope.len();
        if size > self.max_payload {
            self.record(envelope, false);
            return Err(TransportError::TooLarge {
                size,
                limit: self.max_payload,
            });
        }
        if let Some(tx) = &self.loopback
            && tx.send(envelope.clone()).is_err()
        {
            self.record(envelope, false);
            return Err(TransportError::other("loopback receiver closed"));
        }
        self.record(envelope, true);
        Ok(())
    }
}
