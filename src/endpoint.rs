//! Endpoint wiring the interceptors to a transport and a set of handlers.
//!
//! An [`Endpoint`] owns the send pipeline, the receive interceptor and the
//! handler table. Sends issued directly on the endpoint are unscoped; sends
//! issued by handlers go through the [`Outbox`](crate::receive::Outbox) of
//! their processing cycle.

use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, Stream, StreamExt};
use tokio::{select, signal};
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::{
    adjust::AdjustmentPolicy,
    config::AdjustmentConfig,
    envelope::{Envelope, MessageKind},
    error::{HandlerError, RouteError, SendError},
    metrics,
    panic::format_panic,
    receive::{CycleSummary, Handler, ReceiveInterceptor},
    send::SendPipeline,
    transport::Transport,
};

/// Builder for [`Endpoint`].
pub struct EndpointBuilder<T> {
    transport: T,
    policy: AdjustmentPolicy,
    config: AdjustmentConfig,
    routes: HashMap<MessageKind, Handler>,
}

impl<T: Transport> EndpointBuilder<T> {
    /// Set the adjustment policy used by every interceptor.
    #[must_use]
    pub fn policy(mut self, policy: AdjustmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AdjustmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Register `handler` for inbound messages of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateRoute`] if a handler for `kind` has
    /// already been registered.
    pub fn route(
        mut self,
        kind: impl Into<MessageKind>,
        handler: Handler,
    ) -> Result<Self, RouteError> {
        let kind = kind.into();
        if self.routes.contains_key(&kind) {
            return Err(RouteError::DuplicateRoute(kind));
        }
        self.routes.insert(kind, handler);
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> Endpoint {
        let pipeline = SendPipeline::new(self.transport, self.policy, self.config);
        let receive = ReceiveInterceptor::new(pipeline.clone(), self.config);
        Endpoint {
            inner: Arc::new(Inner {
                pipeline,
                receive,
                routes: self.routes,
            }),
        }
    }
}

struct Inner {
    pipeline: SendPipeline,
    receive: ReceiveInterceptor,
    routes: HashMap<MessageKind, Handler>,
}

/// A message endpoint that recovers from oversized sends.
///
/// Cloning is cheap; clones share the same pipeline and handlers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use oversend::{
///     adjust::{AdjustmentPolicy, Truncate},
///     endpoint::Endpoint,
///     envelope::Envelope,
///     receive::handler,
///     transport::MemoryTransport,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(MemoryTransport::new(250));
/// let endpoint = Endpoint::builder(Arc::clone(&transport))
///     .policy(AdjustmentPolicy::new().with("note", Truncate::new(250)))
///     .route(
///         "kick-off",
///         handler(|_, outbox| async move {
///             outbox.send(Envelope::new("note", vec![b'a'; 1024])).await?;
///             outbox.send(Envelope::new("note", vec![b'b'; 1024])).await?;
///             Ok(())
///         }),
///     )?
///     .build();
///
/// let summary = endpoint.dispatch(Envelope::new("kick-off", Vec::new())).await?;
/// assert!(summary.replayed);
/// assert!(transport.delivered().iter().all(|e| e.len() == 250));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<Inner>,
}

impl Endpoint {
    /// Start building an endpoint on top of `transport`.
    pub fn builder<T: Transport>(transport: T) -> EndpointBuilder<T> {
        EndpointBuilder {
            transport,
            policy: AdjustmentPolicy::default(),
            config: AdjustmentConfig::default(),
            routes: HashMap::new(),
        }
    }

    /// Send `envelope` outside any processing cycle.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, [`SendError::AdjustmentExhausted`] if
    /// the adjusted payload was also rejected, or [`SendError::Adjust`] if
    /// the adjustment itself failed.
    pub async fn send(&self, envelope: Envelope) -> Result<(), SendError> {
        self.inner.pipeline.send_unscoped(envelope).await
    }

    /// Run one processing cycle for an inbound `envelope`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::NoRoute`] if no handler is registered for the
    /// envelope's kind, otherwise the final failure of the cycle.
    pub async fn dispatch(&self, envelope: Envelope) -> Result<CycleSummary, HandlerError> {
        let Some(handler) = self.inner.routes.get(envelope.kind()) else {
            return Err(HandlerError::NoRoute(envelope.kind().clone()));
        };
        self.inner.receive.process(envelope, handler).await
    }

    /// Process inbound messages until Ctrl+C is received or `inbound` ends.
    pub async fn run<S>(&self, inbound: S)
    where
        S: Stream<Item = Envelope> + Send,
    {
        self.run_with_shutdown(inbound, async {
            let _ = signal::ctrl_c().await;
        })
        .await;
    }

    /// Process inbound messages until `shutdown` resolves or `inbound` ends.
    ///
    /// Every message runs in its own task, so cycles proceed concurrently.
    /// Failed or panicking cycles are logged and do not stop the loop. On
    /// return, all started cycles have finished.
    pub async fn run_with_shutdown<S, F>(&self, inbound: S, shutdown: F)
    where
        S: Stream<Item = Envelope> + Send,
        F: Future<Output = ()> + Send,
    {
        let tracker = TaskTracker::new();
        let mut inbound = std::pin::pin!(inbound);
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            let envelope = select! {
                biased;
                () = &mut shutdown => break,
                next = inbound.next() => match next {
                    Some(envelope) => envelope,
                    None => break,
                },
            };
            tracker.spawn(self.clone().run_cycle(envelope));
        }

        tracker.close();
        tracker.wait().await;
    }

    async fn run_cycle(self, envelope: Envelope) {
        let kind = envelope.kind().clone();
        match AssertUnwindSafe(self.dispatch(envelope)).catch_unwind().await {
            Ok(Ok(summary)) => {
                debug!(
                    cycle = %summary.cycle,
                    %kind,
                    replayed = summary.replayed,
                    "processing cycle completed"
                );
            }
            Ok(Err(err)) => {
                metrics::inc_cycle_failures();
                error!(%kind, error = %err, "processing cycle failed");
            }
            Err(panic) => {
                metrics::inc_cycle_panics();
                error!(%kind, panic = %format_panic(&*panic), "processing cycle panicked");
            }
        }
    }
}
