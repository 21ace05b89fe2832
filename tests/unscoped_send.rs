//! Sends issued outside any processing cycle.
//!
//! The unscoped interceptor sends first and adjusts only after a size
//! rejection, at most once.

use std::sync::Arc;

use oversend::{
    adjust::{AdjustmentPolicy, Truncate},
    classify::Oversize,
    config::AdjustmentConfig,
    envelope::Envelope,
    error::SendError,
    send::SendPipeline,
    transport::{MemoryTransport, TransportError},
};
use oversend_testing::{Scripted, ScriptedTransport, filled};
use rstest::rstest;

fn truncating(limit: usize) -> AdjustmentPolicy {
    AdjustmentPolicy::new().with("note", Truncate::new(limit))
}

#[tokio::test]
async fn oversized_payload_is_delivered_truncated_after_one_retry() {
    let transport = Arc::new(MemoryTransport::new(250));
    let pipeline = SendPipeline::new(
        Arc::clone(&transport),
        truncating(250),
        AdjustmentConfig::default(),
    );

    pipeline
        .send_unscoped(filled("note", b'a', 256 * 1024))
        .await
        .expect("adjusted payload is delivered");

    let attempts = transport.attempts();
    assert_eq!(attempts.len(), 2, "exactly one retry");
    assert_eq!(attempts[0].envelope.len(), 256 * 1024);
    assert!(!attempts[0].delivered);

    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].len(), 250);
    assert!(delivered.iter().all(|e| e.len() <= 250), "original never delivered");
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(250)]
#[tokio::test]
async fn payloads_within_the_limit_pass_through(#[case] len: usize) {
    let transport = Arc::new(ScriptedTransport::new(250));
    let pipeline = SendPipeline::new(
        Arc::clone(&transport),
        truncating(10),
        AdjustmentConfig::default(),
    );
    let envelope = filled("note", b'z', len);

    pipeline
        .send_unscoped(envelope.clone())
        .await
        .expect("delivered unchanged");

    assert_eq!(transport.seen(), vec![envelope]);
}

#[tokio::test]
async fn still_oversized_adjustment_is_terminal() {
    let transport = Arc::new(ScriptedTransport::new(100));
    let pipeline = SendPipeline::new(
        Arc::clone(&transport),
        truncating(150),
        AdjustmentConfig::default(),
    );

    let err = pipeline
        .send_unscoped(filled("note", b'a', 300))
        .await
        .expect_err("adjusted payload still exceeds the limit");

    match &err {
        SendError::AdjustmentExhausted { kind, size, source } => {
            assert_eq!(kind.as_str(), "note");
            assert_eq!(*size, 150);
            assert!(matches!(source, TransportError::TooLarge { limit: 100, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_too_large(), "exhaustion must not trigger further retries");
    assert_eq!(transport.calls(), 2, "no third attempt");
}

#[tokio::test]
async fn non_size_failures_propagate_without_adjustment() {
    let transport = Arc::new(
        ScriptedTransport::new(10).then(Scripted::Fail(TransportError::other("unauthorised"))),
    );
    let pipeline = SendPipeline::new(
        Arc::clone(&transport),
        truncating(1),
        AdjustmentConfig::default(),
    );

    let err = pipeline
        .send_unscoped(filled("note", b'a', 50))
        .await
        .expect_err("authorisation failure");

    assert!(matches!(err, SendError::Transport(TransportError::Other(_))));
    assert_eq!(err.to_string(), "transport failure: unauthorised");
    assert_eq!(transport.seen().len(), 1);
    assert_eq!(transport.seen()[0].len(), 50, "payload was not adjusted");
}

#[tokio::test]
async fn failure_on_the_retry_is_surfaced_verbatim() {
    let transport = Arc::new(
        ScriptedTransport::new(10)
            .then(Scripted::Limit)
            .then(Scripted::Fail(TransportError::other("connection reset"))),
    );
    let pipeline = SendPipeline::new(
        Arc::clone(&transport),
        truncating(5),
        AdjustmentConfig::default(),
    );

    let err = pipeline
        .send_unscoped(filled("note", b'a', 50))
        .await
        .expect_err("retry failed");

    assert_eq!(err.to_string(), "transport failure: connection reset");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn kinds_without_a_policy_keep_the_original_rejection() {
    let transport = Arc::new(ScriptedTransport::new(10));
    let pipeline = SendPipeline::new(
        Arc::clone(&transport),
        truncating(5),
        AdjustmentConfig::default(),
    );

    let err = pipeline
        .send_unscoped(filled("invoice", b'a', 50))
        .await
        .expect_err("no policy for invoices");

    assert!(err.is_too_large());
    assert_eq!(transport.calls(), 1);
}
