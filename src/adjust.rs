//! Adjustment policies that shrink oversized messages.
//!
//! The interceptors never decide *how* to shrink a payload. They look up an
//! [`Adjust`] implementation for the message's [`MessageKind`] in an
//! [`AdjustmentPolicy`] and apply it at most once per send.
//!
//! ```
//! use oversend::{
//!     adjust::{AdjustmentPolicy, Truncate, typed},
//!     envelope::Envelope,
//! };
//!
//! #[derive(bincode::Encode, bincode::Decode)]
//! struct Report {
//!     body: String,
//! }
//!
//! let policy = AdjustmentPolicy::new()
//!     .with("raw", Truncate::new(4))
//!     .with(
//!         "report",
//!         typed(|report: Report| Report {
//!             body: report.body.chars().take(3).collect(),
//!         }),
//!     );
//!
//! let adjusted = policy
//!     .adjust(&Envelope::new("raw", vec![0; 10]))
//!     .expect("policy registered")
//!     .expect("truncate never fails");
//! assert_eq!(adjusted.len(), 4);
//! assert!(policy.adjust(&Envelope::new("other", vec![0; 10])).is_none());
//! ```

use std::{collections::HashMap, fmt, marker::PhantomData, sync::Arc};

use crate::{
    envelope::{Envelope, MessageKind},
    error::AdjustError,
    message::Message,
};

/// A pure function producing a smaller replacement for an envelope.
///
/// Implementations must not depend on hidden state: the same input must
/// always yield the same output.
pub trait Adjust: Send + Sync {
    /// Produce the adjusted replacement for `envelope`.
    ///
    /// # Errors
    ///
    /// Returns an [`AdjustError`] if no replacement can be produced.
    fn adjust(&self, envelope: &Envelope) -> Result<Envelope, AdjustError>;
}

impl<F> Adjust for F
where
    F: Fn(&Envelope) -> Result<Envelope, AdjustError> + Send + Sync,
{
    fn adjust(&self, envelope: &Envelope) -> Result<Envelope, AdjustError> { self(envelope) }
}

/// Keep at most `max_len` payload bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Truncate {
    max_len: usize,
}

impl Truncate {
    #[must_use]
    pub const fn new(max_len: usize) -> Self { Self { max_len } }

    #[must_use]
    pub const fn max_len(&self) -> usize { self.max_len }
}

impl Adjust for Truncate {
    fn adjust(&self, envelope: &Envelope) -> Result<Envelope, AdjustError> {
        let keep = envelope.len().min(self.max_len);
        Ok(envelope.with_payload(envelope.payload().slice(..keep)))
    }
}

/// Adjustment operating on a decoded [`Message`]; see [`typed`].
pub struct Typed<M, F> {
    shrink: F,
    _message: PhantomData<fn(M) -> M>,
}

/// Build an adjustment that decodes the payload as `M`, applies `shrink` and
/// encodes the result.
pub fn typed<M, F>(shrink: F) -> Typed<M, F>
where
    M: Message,
    F: Fn(M) -> M + Send + Sync,
{
    Typed {
        shrink,
        _message: PhantomData,
    }
}

impl<M, F> Adjust for Typed<M, F>
where
    M: Message,
    F: Fn(M) -> M + Send + Sync,
{
    fn adjust(&self, envelope: &Envelope) -> Result<Envelope, AdjustError> {
        let message: M = envelope.decode()?;
        let bytes = (self.shrink)(message).to_bytes()?;
        Ok(envelope.with_payload(bytes))
    }
}

/// Per-kind registry of adjustments.
#[derive(Clone, Default)]
pub struct AdjustmentPolicy {
    by_kind: HashMap<MessageKind, Arc<dyn Adjust>>,
}

impl AdjustmentPolicy {
    /// Create an empty policy. Messages of unregistered kinds are never
    /// adjusted.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `adjustment` for messages of `kind`, replacing any previous
    /// registration.
    #[must_use]
    pub fn with(mut self, kind: impl Into<MessageKind>, adjustment: impl Adjust + 'static) -> Self {
        self.by_kind.insert(kind.into(), Arc::new(adjustment));
        self
    }

    /// Look up the adjustment for `kind`.
    #[must_use]
    pub fn get(&self, kind: &MessageKind) -> Option<&dyn Adjust> {
        self.by_kind.get(kind).map(AsRef::as_ref)
    }

    /// Returns `true` if an adjustment is registered for `kind`.
    #[must_use]
    pub fn covers(&self, kind: &MessageKind) -> bool { self.by_kind.contains_key(kind) }

    /// Apply the adjustment registered for the envelope's kind, if any.
    #[must_use]
    pub fn adjust(&self, envelope: &Envelope) -> Option<Result<Envelope, AdjustError>> {
        self.get(envelope.kind())
            .map(|adjustment| adjustment.adjust(envelope))
    }
}

impl fmt::Debug for AdjustmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.by_kind.keys().map(MessageKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("AdjustmentPolicy")
            .field("kinds", &kinds)
            .finish()
    }
}
