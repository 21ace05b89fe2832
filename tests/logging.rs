//! Diagnostics emitted by the interceptors.
//!
//! `tracing` forwards events to `log`, so the shared `logtest` fixture sees
//! them.

use oversend::{
    adjust::{AdjustmentPolicy, Truncate},
    config::AdjustmentConfig,
    endpoint::Endpoint,
    envelope::Envelope,
    receive::{Outbox, handler},
    transport::MemoryTransport,
};
use oversend_testing::{LoggerHandle, logger};
use rstest::rstest;

fn endpoint(config: AdjustmentConfig) -> Endpoint {
    Endpoint::builder(MemoryTransport::new(8))
        .policy(AdjustmentPolicy::new().with("note", Truncate::new(8)))
        .config(config)
        .route(
            "in",
            handler(|_, outbox: Outbox| async move {
                outbox.send(Envelope::new("note", vec![0; 32])).await?;
                Ok(())
            }),
        )
        .expect("register route")
        .build()
}

#[rstest]
#[tokio::test]
async fn replay_and_adjustment_are_logged(mut logger: LoggerHandle) {
    endpoint(AdjustmentConfig::default())
        .dispatch(Envelope::new("in", Vec::new()))
        .await
        .expect("cycle completes");

    let messages = logger.messages();
    assert!(
        messages
            .iter()
            .any(|m| m.contains("replaying cycle with adjustment")),
        "replay not logged: {messages:?}"
    );
    assert!(
        messages
            .iter()
            .any(|m| m.contains("adjusting oversized message")),
        "adjustment not logged: {messages:?}"
    );
}

#[rstest]
#[tokio::test]
async fn adjustment_logging_can_be_disabled(mut logger: LoggerHandle) {
    endpoint(AdjustmentConfig::default().log_adjustments(false))
        .dispatch(Envelope::new("in", Vec::new()))
        .await
        .expect("cycle completes");

    let messages = logger.messages();
    assert!(
        !messages
            .iter()
            .any(|m| m.contains("adjusting oversized message"))
    );
    assert!(
        messages
            .iter()
            .any(|m| m.contains("replaying cycle with adjustment"))
    );
}
