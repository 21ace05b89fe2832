//! Envelope builders for size-related tests.

use oversend::envelope::{Envelope, MessageKind};

/// An envelope of `kind` whose payload is `len` copies of `byte`.
pub fn filled(kind: impl Into<MessageKind>, byte: u8, len: usize) -> Envelope {
    Envelope::new(kind, vec![byte; len])
}

/// An envelope one byte larger than `limit`.
pub fn oversized(kind: impl Into<MessageKind>, limit: usize) -> Envelope {
    filled(kind, b'a', limit + 1)
}
