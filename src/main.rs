//! Demo binary showing oversized sends being recovered.
//!
//! A kick-off message is handled by a handler that sends two oversized
//! messages; the cycle is replayed and both are truncated before delivery.
//! A second oversized message sent outside any handler is truncated after
//! its first rejection.

mod cli;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use oversend::{
    adjust::{AdjustmentPolicy, typed},
    endpoint::Endpoint,
    envelope::Envelope,
    error::HandlerError,
    receive::handler,
    transport::MemoryTransport,
};
use tokio::{signal, sync::mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const KICK_OFF: &str = "kick-off";
const SOMETIMES_FAILS: &str = "sometimes-fails";

#[derive(bincode::Encode, bincode::Decode)]
struct SometimesFails {
    property: String,
}

fn oversized(fill: char, len: usize) -> Result<Envelope, bincode::error::EncodeError> {
    Envelope::from_message(
        SOMETIMES_FAILS,
        &SometimesFails {
            property: std::iter::repeat_n(fill, len).collect(),
        },
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = cli::Cli::parse();
    let keep = cli.truncate_to;
    let size = cli.payload_size;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let transport = Arc::new(MemoryTransport::new(cli.max_payload).with_loopback(tx));
    let policy = AdjustmentPolicy::new().with(
        SOMETIMES_FAILS,
        typed(move |message: SometimesFails| SometimesFails {
            property: message.property.chars().take(keep).collect(),
        }),
    );

    let endpoint = Endpoint::builder(Arc::clone(&transport))
        .policy(policy)
        .route(
            KICK_OFF,
            handler(move |envelope: Envelope, outbox| async move {
                info!(correlation_id = ?envelope.correlation_id(), "handling kick-off");
                let tag = envelope.correlation_id();
                let first = oversized('a', size)
                    .map_err(HandlerError::application)?
                    .with_correlation_id(tag);
                let second = oversized('b', size)
                    .map_err(HandlerError::application)?
                    .with_correlation_id(tag);
                outbox.send(first).await?;
                outbox.send(second).await?;
                Ok(())
            }),
        )?
        .route(
            SOMETIMES_FAILS,
            handler(|envelope: Envelope, _| async move {
                let message: SometimesFails = envelope.decode().map_err(HandlerError::application)?;
                info!(len = message.property.len(), "received message");
                Ok(())
            }),
        )?
        .build();

    let inbound = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));
    let runner = tokio::spawn({
        let endpoint = endpoint.clone();
        let linger = Duration::from_millis(cli.linger_ms);
        async move {
            endpoint
                .run_with_shutdown(inbound, async move {
                    tokio::select! {
                        _ = signal::ctrl_c() => {}
                        () = tokio::time::sleep(linger) => {}
                    }
                })
                .await;
        }
    });

    if let Err(err) = endpoint
        .send(Envelope::new(KICK_OFF, Vec::new()).with_correlation_id(Some(1)))
        .await {
        error!(error = %err, "kick-off send failed");
    }
    if let Err(err) = endpoint
        .send(oversized('a', size)?.with_correlation_id(Some(2)))
        .await {
        error!(error = %err, "direct send failed");
    }

    runner.await?;
    for attempt in transport.attempts() {
        info!(
            kind = %attempt.envelope.kind(),
            correlation_id = ?attempt.envelope.correlation_id(),
            len = attempt.envelope.len(),
            delivered = attempt.delivered,
            "transport attempt"
        );
    }
    Ok(())
}
