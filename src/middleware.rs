//! Middleware primitives for the outgoing send path.
//!
//! Every outgoing message travels through a chain of [`SendService`]s. Each
//! interceptor wraps the next service in the chain and decides whether to
//! forward, adjust or retry; the innermost service hands the envelope to the
//! [`Transport`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    context::ProcessingContext,
    envelope::Envelope,
    error::SendError,
    transport::Transport,
};

/// Outgoing message wrapper passed through the send chain.
#[derive(Clone, Debug)]
pub struct SendRequest {
    envelope: Envelope,
    context: Option<ProcessingContext>,
    adjusted: bool,
}

impl SendRequest {
    /// A send issued outside any processing cycle.
    #[must_use]
    pub fn unscoped(envelope: Envelope) -> Self {
        Self {
            envelope,
            context: None,
            adjusted: false,
        }
    }

    /// A send issued while processing an inbound message.
    #[must_use]
    pub fn in_cycle(envelope: Envelope, context: ProcessingContext) -> Self {
        Self {
            envelope,
            context: Some(context),
            adjusted: false,
        }
    }

    #[must_use]
    pub fn envelope(&self) -> &Envelope { &self.envelope }

    /// The processing context of the originating cycle, if any.
    #[must_use]
    pub fn context(&self) -> Option<&ProcessingContext> { self.context.as_ref() }

    /// Whether an interceptor already replaced the payload.
    #[must_use]
    pub fn is_adjusted(&self) -> bool { self.adjusted }

    /// Replace the envelope with its adjusted form, keeping the context.
    #[must_use]
    pub fn into_adjusted(self, envelope: Envelope) -> Self {
        Self {
            envelope,
            context: self.context,
            adjusted: true,
        }
    }

    #[must_use]
    pub fn into_envelope(self) -> Envelope { self.envelope }
}

/// Continuation used by middleware to call the next service in the chain.
pub struct Next<'a, S>
where
    S: SendService + ?Sized,
{
    service: &'a S,
}

impl<'a, S> Next<'a, S>
where
    S: SendService + ?Sized,
{
    /// Creates a new `Next` wrapping a reference to the given service.
    pub const fn new(service: &'a S) -> Self { Self { service } }

    /// Call the next service with the given request.
    ///
    /// # Errors
    ///
    /// Propagates any error produced further down the chain.
    pub async fn call(&self, req: SendRequest) -> Result<(), SendError> {
        self.service.call(req).await
    }
}

/// An asynchronous stage of the send chain.
#[async_trait]
pub trait SendService: Send + Sync {
    /// Process `req`, usually by forwarding it to the next stage.
    async fn call(&self, req: SendRequest) -> Result<(), SendError>;
}

#[async_trait]
impl<S> SendService for Arc<S>
where
    S: SendService + ?Sized,
{
    async fn call(&self, req: SendRequest) -> Result<(), SendError> { (**self).call(req).await }
}

/// Type-erased send service shared between clones of a pipeline.
pub type BoxSendService = Arc<dyn SendService>;

/// Factory for wrapping a send service with middleware.
pub trait Transform<S>: Send + Sync
where
    S: SendService,
{
    /// Wrapped service produced by the middleware.
    type Output: SendService;

    /// Create a new middleware service wrapping `service`.
    fn transform(&self, service: S) -> Self::Output;
}

/// Terminal stage delivering requests to a [`Transport`].
#[derive(Debug)]
pub struct TransportService<T> {
    transport: T,
}

impl<T: Transport> TransportService<T> {
    #[must_use]
    pub fn new(transport: T) -> Self { Self { transport } }
}

#[async_trait]
impl<T: Transport> SendService for TransportService<T> {
    async fn call(&self, req: SendRequest) -> Result<(), SendError> {
        self.transport
            .send(req.into_envelope())
            .await
            .map_err(SendError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{context::CycleId, transport::MemoryTransport};

    struct Recorder {
        inner: BoxSendService,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl SendService for Recorder {
        async fn call(&self, req: SendRequest) -> Result<(), SendError> {
            self.seen.lock().expect("lock").push(req.envelope().len());
            Next::new(&self.inner).call(req).await
        }
    }

    #[tokio::test]
    async fn next_forwards_to_the_wrapped_service() {
        let transport = Arc::new(MemoryTransport::new(8));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let service = Recorder {
            inner: Arc::new(TransportService::new(Arc::clone(&transport))),
            seen: Arc::clone(&seen),
        };

        service
            .call(SendRequest::unscoped(Envelope::new("m", vec![0; 3])))
            .await
            .expect("delivered");

        assert_eq!(*seen.lock().expect("lock"), vec![3]);
        assert_eq!(transport.delivered().len(), 1);
    }

    #[tokio::test]
    async fn transport_failures_are_wrapped_verbatim() {
        let service = TransportService::new(MemoryTransport::new(1));
        let err = service
            .call(SendRequest::unscoped(Envelope::new("m", vec![0; 2])))
            .await
            .expect_err("payload exceeds limit");
        assert!(matches!(
            err,
            SendError::Transport(crate::transport::TransportError::TooLarge { size: 2, limit: 1 })
        ));
    }

    #[test]
    fn adjusting_keeps_the_context() {
        let ctx = ProcessingContext::new(CycleId::from(5));
        let req = SendRequest::in_cycle(Envelope::new("m", vec![0; 4]), ctx)
            .into_adjusted(Envelope::new("m", vec![0; 1]));
        assert!(req.is_adjusted());
        assert_eq!(req.context(), Some(&ctx));
        assert_eq!(req.envelope().len(), 1);
    }
}
