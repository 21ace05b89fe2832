//! A transport whose outcomes are scripted by the test.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use oversend::{
    envelope::Envelope,
    transport::{SendOutcome, Transport, TransportError},
};

/// Outcome forced for one upcoming send.
#[derive(Debug)]
pub enum Scripted {
    /// Apply the size limit as usual.
    Limit,
    /// Fail with the given error regardless of size.
    Fail(TransportError),
}

/// Transport that applies a size limit unless a scripted outcome is queued.
///
/// Scripted outcomes are consumed one per send, in order. Every envelope the
/// transport receives is recorded.
#[derive(Debug)]
pub struct ScriptedTransport {
    limit: usize,
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<Envelope>>,
}

impl ScriptedTransport {
    /// Create a transport rejecting payloads larger than `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue an outcome for the next unscripted send.
    #[must_use]
    pub fn then(self, outcome: Scripted) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    /// Every envelope handed to the transport, in call order.
    pub fn seen(&self) -> Vec<Envelope> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of sends attempted.
    pub fn calls(&self) -> usize { self.seen.lock().unwrap_or_else(PoisonError::into_inner).len() }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, envelope: Envelope) -> SendOutcome {
        let size = envelope.len();
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope);
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match scripted {
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Limit) | None if size > self.limit => Err(TransportError::TooLarge {
                size,
                limit: self.limit,
            }),
            Some(Scripted::Limit) | None => Ok(()),
        }
    }
}
