//! Per-cycle processing state.
//!
//! A [`ProcessingContext`] belongs to exactly one inbound message cycle. It
//! travels with the cycle's [`Outbox`] rather than living in thread-local
//! storage, so it follows the cycle across suspension points and worker
//! threads and is never observed by a concurrent cycle.
//!
//! [`Outbox`]: crate::receive::Outbox

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Identifier for one inbound processing cycle, unique within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(u64);

impl CycleId {
    /// Allocate the next identifier.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

impl From<u64> for CycleId {
    fn from(value: u64) -> Self { Self(value) }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// State scoped to one inbound message cycle.
///
/// The only mutable field is the "adjustment required" flag. It starts
/// cleared and is set by the receive interceptor before it replays a cycle
/// whose handler hit a size rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessingContext {
    cycle: CycleId,
    needs_adjustment: bool,
}

impl ProcessingContext {
    /// Start a fresh context for `cycle` with the flag cleared.
    #[must_use]
    pub const fn new(cycle: CycleId) -> Self {
        Self {
            cycle,
            needs_adjustment: false,
        }
    }

    #[must_use]
    pub const fn cycle(&self) -> CycleId { self.cycle }

    /// Whether sends in this cycle must be adjusted before transmission.
    #[must_use]
    pub const fn needs_adjustment(&self) -> bool { self.needs_adjustment }

    pub(crate) fn require_adjustment(&mut self) { self.needs_adjustment = true; }
}
