//! Send interceptors and the pipeline composing them.
//!
//! [`SendPipeline::new`] builds the standard chain, outermost first:
//!
//! 1. [`UnscopedAdjust`]: reactive, acts only on sends made outside a
//!    processing cycle.
//! 2. [`InContextAdjust`]: preemptive, acts only on sends made by a cycle
//!    whose context requires adjustment.
//! 3. [`TransportService`]: hands the envelope to the transport.
//!
//! Each interceptor adjusts a request at most once and leaves every failure
//! other than a size rejection untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    adjust::AdjustmentPolicy,
    classify::Oversize,
    config::AdjustmentConfig,
    envelope::Envelope,
    error::SendError,
    metrics::{self, Scope},
    middleware::{BoxSendService, Next, SendRequest, SendService, Transform, TransportService},
    transport::Transport,
};

/// Shared state both interceptors need.
#[derive(Clone, Debug)]
struct Adjuster {
    policy: Arc<AdjustmentPolicy>,
    config: AdjustmentConfig,
}

impl Adjuster {
    /// Apply the registered adjustment, or `None` if the kind has no policy.
    fn adjust(&self, envelope: &Envelope, scope: Scope) -> Option<Result<Envelope, SendError>> {
        let adjusted = match self.policy.adjust(envelope)? {
            Ok(adjusted) => adjusted,
            Err(source) => {
                return Some(Err(SendError::Adjust {
                    kind: envelope.kind().clone(),
                    source,
                }));
            }
        };
        metrics::inc_adjustments(scope);
        if self.config.log_adjustments {
            info!(
                kind = %envelope.kind(),
                correlation_id = ?envelope.correlation_id(),
                scope = scope.as_str(),
                original_len = envelope.len(),
                adjusted_len = adjusted.len(),
                "adjusting oversized message"
            );
        }
        Some(Ok(adjusted))
    }

    /// Send an already adjusted request, converting a further size rejection
    /// into [`SendError::AdjustmentExhausted`].
    async fn send_adjusted<S>(
        next: Next<'_, S>,
        req: SendRequest,
        scope: Scope,
    ) -> Result<(), SendError>
    where
        S: SendService + ?Sized,
    {
        let kind = req.envelope().kind().clone();
        let size = req.envelope().len();
        let correlation_id = req.envelope().correlation_id();
        match next.call(req).await {
            Err(error) if error.is_too_large() => {
                metrics::inc_adjustments_exhausted(scope);
                warn!(
                    %kind,
                    ?correlation_id,
                    size,
                    scope = scope.as_str(),
                    "adjusted message still too large"
                );
                Err(SendError::exhausted(kind, size, error))
            }
            outcome => outcome,
        }
    }
}

/// Reactive interceptor for sends issued outside any processing cycle.
///
/// The request is sent unchanged first. If the transport rejects it as too
/// large and a policy covers its kind, the adjusted envelope is sent once.
pub struct UnscopedAdjust<S> {
    inner: S,
    adjuster: Adjuster,
}

#[async_trait]
impl<S> SendService for UnscopedAdjust<S>
where
    S: SendService + 'static,
{
    async fn call(&self, req: SendRequest) -> Result<(), SendError> {
        let next = Next::new(&self.inner);
        let unscoped = req.context().is_none() && !req.is_adjusted();
        if !unscoped || !self.adjuster.config.adjust_unscoped_sends {
            return next.call(req).await;
        }

        let original = req.envelope().clone();
        match next.call(req).await {
            Err(error) if error.is_too_large() => {
                let Some(adjusted) = self.adjuster.adjust(&original, Scope::Unscoped) else {
                    debug!(kind = %original.kind(), "no adjustment registered for oversized message");
                    return Err(error);
                };
                let retry = SendRequest::unscoped(original).into_adjusted(adjusted?);
                Adjuster::send_adjusted(next, retry, Scope::Unscoped).await
            }
            outcome => outcome,
        }
    }
}

/// Preemptive interceptor for sends issued by a processing cycle.
///
/// When the cycle's context requires adjustment, every envelope covered by
/// the policy is adjusted before the transport sees it. Otherwise the
/// request passes through and any size rejection reaches the receive
/// interceptor, which replays the cycle.
pub struct InContextAdjust<S> {
    inner: S,
    adjuster: Adjuster,
}

#[async_trait]
impl<S> SendService for InContextAdjust<S>
where
    S: SendService + 'static,
{
    async fn call(&self, req: SendRequest) -> Result<(), SendError> {
        let next = Next::new(&self.inner);
        let flagged = req.context().is_some_and(|ctx| ctx.needs_adjustment());
        if !flagged || req.is_adjusted() || !self.adjuster.config.preemptive_in_cycle {
            return next.call(req).await;
        }

        let Some(adjusted) = self.adjuster.adjust(req.envelope(), Scope::InCycle) else {
            debug!(kind = %req.envelope().kind(), "no adjustment registered, sending as is");
            return next.call(req).await;
        };
        let req = req.into_adjusted(adjusted?);
        Adjuster::send_adjusted(next, req, Scope::InCycle).await
    }
}

/// Middleware factory for [`UnscopedAdjust`].
#[derive(Clone, Debug)]
pub struct UnscopedAdjustLayer(Adjuster);

impl UnscopedAdjustLayer {
    #[must_use]
    pub fn new(policy: Arc<AdjustmentPolicy>, config: AdjustmentConfig) -> Self {
        Self(Adjuster { policy, config })
    }
}

impl<S> Transform<S> for UnscopedAdjustLayer
where
    S: SendService + 'static,
{
    type Output = UnscopedAdjust<S>;

    fn transform(&self, service: S) -> Self::Output {
        UnscopedAdjust {
            inner: service,
            adjuster: self.0.clone(),
        }
    }
}

/// Middleware factory for [`InContextAdjust`].
#[derive(Clone, Debug)]
pub struct InContextAdjustLayer(Adjuster);

impl InContextAdjustLayer {
    #[must_use]
    pub fn new(policy: Arc<AdjustmentPolicy>, config: AdjustmentConfig) -> Self {
        Self(Adjuster { policy, config })
    }
}

impl<S> Transform<S> for InContextAdjustLayer
where
    S: SendService + 'static,
{
    type Output = InContextAdjust<S>;

    fn transform(&self, service: S) -> Self::Output {
        InContextAdjust {
            inner: service,
            adjuster: self.0.clone(),
        }
    }
}

/// An ordered chain of send interceptors ending at a transport.
///
/// Cloning is cheap; clones share the same chain.
#[derive(Clone)]
pub struct SendPipeline {
    service: BoxSendService,
}

impl SendPipeline {
    /// Build the standard chain: unscoped adjustment, then in-context
    /// adjustment, then the transport.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use oversend::{
    ///     adjust::{AdjustmentPolicy, Truncate},
    ///     config::AdjustmentConfig,
    ///     envelope::Envelope,
    ///     send::SendPipeline,
    ///     transport::MemoryTransport,
    /// };
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let transport = Arc::new(MemoryTransport::new(250));
    /// let pipeline = SendPipeline::new(
    ///     Arc::clone(&transport),
    ///     AdjustmentPolicy::new().with("note", Truncate::new(250)),
    ///     AdjustmentConfig::default(),
    /// );
    ///
    /// pipeline
    ///     .send_unscoped(Envelope::new("note", vec![b'a'; 256 * 1024]))
    ///     .await
    ///     .expect("delivered after adjustment");
    /// assert_eq!(transport.delivered()[0].len(), 250);
    /// # }
    /// ```
    pub fn new<T: Transport>(
        transport: T,
        policy: AdjustmentPolicy,
        config: AdjustmentConfig,
    ) -> Self {
        let policy = Arc::new(policy);
        Self::builder(TransportService::new(transport))
            .layer(InContextAdjustLayer::new(Arc::clone(&policy), config))
            .layer(UnscopedAdjustLayer::new(policy, config))
            .build()
    }

    /// Start a custom chain ending at `terminal`.
    pub fn builder<S: SendService + 'static>(terminal: S) -> SendPipelineBuilder {
        SendPipelineBuilder {
            service: Arc::new(terminal),
        }
    }

    /// Send `req` through the chain.
    ///
    /// # Errors
    ///
    /// Returns the failure of the outermost interceptor.
    pub async fn send(&self, req: SendRequest) -> Result<(), SendError> { self.service.call(req).await }

    /// Send an envelope that does not belong to any processing cycle.
    ///
    /// # Errors
    ///
    /// See [`SendPipeline::send`].
    pub async fn send_unscoped(&self, envelope: Envelope) -> Result<(), SendError> {
        self.send(SendRequest::unscoped(envelope)).await
    }
}

/// Builder for a custom [`SendPipeline`].
///
/// Each call to [`layer`](Self::layer) wraps everything added before it, so
/// the last layer added runs first.
pub struct SendPipelineBuilder {
    service: BoxSendService,
}

impl SendPipelineBuilder {
    /// Wrap the current chain with `layer`.
    #[must_use]
    pub fn layer<L>(self, layer: L) -> Self
    where
        L: Transform<BoxSendService>,
        L::Output: 'static,
    {
        Self {
            service: Arc::new(layer.transform(self.service)),
        }
    }

    #[must_use]
    pub fn build(self) -> SendPipeline { SendPipeline { service: self.service } }
}
