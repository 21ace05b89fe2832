//! The receive interceptor and the send capability handed to handlers.
//!
//! [`ReceiveInterceptor::process`] runs one processing cycle for one inbound
//! message. If the handler fails because a send was rejected as too large,
//! the cycle's [`ProcessingContext`] is flagged and the handler is replayed
//! from the start exactly once. During the replay every send made through
//! the [`Outbox`] carries the flagged context, so the in-context interceptor
//! adjusts it before the transport sees it.
//!
//! Replaying re-executes the whole handler, including any sends that
//! succeeded before the failure. Handlers must tolerate running twice.

use std::{future::Future, pin::Pin, sync::Arc};

use tracing::{debug, warn};

use crate::{
    classify::Oversize,
    config::AdjustmentConfig,
    context::{CycleId, ProcessingContext},
    envelope::Envelope,
    error::{HandlerError, SendError},
    metrics,
    middleware::SendRequest,
    send::SendPipeline,
};

/// Alias for asynchronous message handlers.
///
/// A handler receives the inbound envelope and an [`Outbox`] for issuing
/// further sends. It may be invoked twice for the same message.
pub type Handler = Arc<
    dyn Fn(Envelope, Outbox) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>
        + Send
        + Sync,
>;

/// Build a [`Handler`] from an async closure.
///
/// # Examples
///
/// ```
/// use oversend::{envelope::Envelope, receive::handler};
///
/// let echo = handler(|envelope: Envelope, outbox| async move {
///     outbox.send(envelope).await?;
///     Ok(())
/// });
/// # let _ = echo;
/// ```
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Envelope, Outbox) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(move |envelope, outbox| Box::pin(f(envelope, outbox)))
}

/// Send capability scoped to one pass of a processing cycle.
///
/// Every send carries the cycle's context. Clones may be moved into spawned
/// tasks; the context travels with them.
#[derive(Clone)]
pub struct Outbox {
    pipeline: SendPipeline,
    context: ProcessingContext,
}

impl Outbox {
    #[must_use]
    pub fn new(pipeline: SendPipeline, context: ProcessingContext) -> Self {
        Self { pipeline, context }
    }

    /// Context of the cycle this outbox belongs to.
    #[must_use]
    pub fn context(&self) -> ProcessingContext { self.context }

    /// Send `envelope` as part of this cycle.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's failure. A size rejection of an unadjusted
    /// send is returned as-is so that `?` carries it back to the receive
    /// interceptor.
    pub async fn send(&self, envelope: Envelope) -> Result<(), SendError> {
        self.pipeline
            .send(SendRequest::in_cycle(envelope, self.context))
            .await
    }
}

/// States of one processing cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    /// First invocation of the handler.
    Handling,
    /// Replay of the handler with adjustment required.
    Retrying,
    /// The handler completed.
    Done,
    /// The cycle failed terminally.
    Failed,
}

impl CycleState {
    /// Returns the state name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handling => "handling",
            Self::Retrying => "retrying",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Next state after a handler pass finished with `outcome`.
    fn advance(self, outcome: &Result<(), HandlerError>, replay: bool) -> Self {
        match (self, outcome) {
            (Self::Handling | Self::Retrying, Ok(())) => Self::Done,
            (Self::Handling, Err(error)) if replay && error.is_too_large() => Self::Retrying,
            _ => Self::Failed,
        }
    }
}

/// Report for a completed cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleSummary {
    /// The cycle that completed.
    pub cycle: CycleId,
    /// Whether the handler had to be replayed with adjustment required.
    pub replayed: bool,
}

/// Wraps the handling of every inbound message.
#[derive(Clone)]
pub struct ReceiveInterceptor {
    pipeline: SendPipeline,
    config: AdjustmentConfig,
}

impl ReceiveInterceptor {
    #[must_use]
    pub fn new(pipeline: SendPipeline, config: AdjustmentConfig) -> Self {
        Self { pipeline, config }
    }

    /// Run one processing cycle for `envelope`.
    ///
    /// # Errors
    ///
    /// Returns the handler's error unchanged when the cycle fails: on the
    /// first pass for anything but a size rejection, and on the replay for
    /// any failure.
    pub async fn process(
        &self,
        envelope: Envelope,
        handler: &Handler,
    ) -> Result<CycleSummary, HandlerError> {
        let mut context = ProcessingContext::new(CycleId::next());
        let mut state = CycleState::Handling;
        loop {
            let outbox = Outbox::new(self.pipeline.clone(), context);
            let outcome = handler(envelope.clone(), outbox).await;
            let next = state.advance(&outcome, self.config.replay_oversized_cycles);
            debug!(
                cycle = %context.cycle(),
                kind = %envelope.kind(),
                from = state.as_str(),
                to = next.as_str(),
                "processing cycle transition"
            );
            match outcome {
                Ok(()) => {
                    return Ok(CycleSummary {
                        cycle: context.cycle(),
                        replayed: state == CycleState::Retrying,
                    });
                }
                Err(error) if next == CycleState::Retrying => {
                    metrics::inc_cycle_replays();
                    warn!(
                        cycle = %context.cycle(),
                        kind = %envelope.kind(),
                        %error,
                        "message too large, replaying cycle with adjustment"
                    );
                    context.require_adjustment();
                }
                Err(error) => return Err(error),
            }
            state = next;
        }
    }
}
