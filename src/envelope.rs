//! Immutable message envelopes passed between handlers, interceptors and the
//! transport.
//!
//! An [`Envelope`] pairs a [`MessageKind`] with an opaque payload. The kind is
//! used both to route inbound messages to a handler and to look up the
//! adjustment applied when a payload is too large for the transport.

use std::{borrow::Cow, fmt};

use bincode::error::{DecodeError, EncodeError};
use bytes::Bytes;

use crate::message::Message;

/// Name identifying the type of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKind(Cow<'static, str>);

impl MessageKind {
    /// Create a kind from a static name without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self { Self(Cow::Borrowed(name)) }

    /// Return the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&'static str> for MessageKind {
    fn from(name: &'static str) -> Self { Self::from_static(name) }
}

impl From<String> for MessageKind {
    fn from(name: String) -> Self { Self(Cow::Owned(name)) }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A message travelling through the pipeline.
///
/// Envelopes are immutable: adjusting a payload produces a new envelope via
/// [`Envelope::with_payload`] and leaves the original untouched. Cloning is
/// cheap because the payload is reference counted.
///
/// # Examples
///
/// ```
/// use oversend::envelope::Envelope;
///
/// let original = Envelope::new("greeting", vec![b'a'; 8]);
/// let shorter = original.with_payload(vec![b'a'; 2]);
///
/// assert_eq!(original.len(), 8);
/// assert_eq!(shorter.len(), 2);
/// assert_eq!(shorter.kind(), original.kind());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    kind: MessageKind,
    correlation_id: Option<u64>,
    payload: Bytes,
}

impl Envelope {
    /// Create an envelope carrying raw payload bytes.
    #[must_use]
    pub fn new(kind: impl Into<MessageKind>, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: kind.into(),
            correlation_id: None,
            payload: payload.into(),
        }
    }

    /// Encode `message` and wrap it in an envelope of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if the message cannot be serialized.
    pub fn from_message<M: Message>(
        kind: impl Into<MessageKind>,
        message: &M,
    ) -> Result<Self, EncodeError> {
        Ok(Self::new(kind, message.to_bytes()?))
    }

    /// Decode the payload as a typed message.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the payload is not a valid `M`.
    pub fn decode<M: Message>(&self) -> Result<M, DecodeError> {
        M::from_bytes(&self.payload).map(|(message, _)| message)
    }

    /// Return a copy of this envelope tagged with `correlation_id`.
    #[must_use]
    pub fn with_correlation_id(&self, correlation_id: Option<u64>) -> Self {
        Self {
            correlation_id,
            ..self.clone()
        }
    }

    /// Return a new envelope with the same kind and correlation identifier
    /// but a different payload.
    #[must_use]
    pub fn with_payload(&self, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: self.kind.clone(),
            correlation_id: self.correlation_id,
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &MessageKind { &self.kind }

    #[must_use]
    pub fn correlation_id(&self) -> Option<u64> { self.correlation_id }

    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.payload.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.payload.is_empty() }
}
