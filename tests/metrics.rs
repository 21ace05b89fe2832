#![cfg(feature = "metrics")]
//! Tests for `oversend` metrics.
//!
//! These tests verify that counters update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use std::sync::Arc;

use metrics::{SharedString, Unit};
use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, DebuggingRecorder, Snapshotter},
};
use oversend::{
    adjust::{AdjustmentPolicy, Truncate},
    endpoint::Endpoint,
    envelope::Envelope,
    metrics::{self as oversend_metrics, Scope},
    receive::{Outbox, handler},
    transport::MemoryTransport,
};

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

type Recorded = (CompositeKey, Option<Unit>, Option<SharedString>, DebugValue);

/// Sums the counters named `name` in one snapshot, optionally matching a label.
fn counter(metrics: &[Recorded], name: &str, label: Option<(&str, &str)>) -> u64 {
    metrics
        .iter()
        .filter(|(k, _, _, _)| {
            k.key().name() == name
                && label.is_none_or(|(key, value)| {
                    k.key()
                        .labels()
                        .any(|l| l.key() == key && l.value() == value)
                })
        })
        .map(|(_, _, _, v)| match v {
            DebugValue::Counter(c) => *c,
            _ => 0,
        })
        .sum()
}

#[test]
fn adjustment_metric_carries_the_scope() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        oversend_metrics::inc_adjustments(Scope::InCycle);
    });

    let metrics = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter(
            &metrics,
            oversend_metrics::ADJUSTMENTS_TOTAL,
            Some(("scope", "in_cycle"))
        ),
        1
    );
}

#[test]
fn replayed_cycle_updates_counters() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("build runtime");
    let endpoint = Endpoint::builder(MemoryTransport::new(8))
        .policy(AdjustmentPolicy::new().with("note", Truncate::new(8)))
        .route(
            "in",
            handler(|_, outbox: Outbox| async move {
                outbox.send(Envelope::new("note", vec![0; 32])).await?;
                Ok(())
            }),
        )
        .expect("register route")
        .build();

    metrics::with_local_recorder(&recorder, || {
        runtime
            .block_on(endpoint.dispatch(Envelope::new("in", Vec::new())))
            .expect("cycle completes");
    });

    let metrics = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter(&metrics, oversend_metrics::CYCLE_REPLAYS_TOTAL, None),
        1
    );
    assert_eq!(
        counter(
            &metrics,
            oversend_metrics::ADJUSTMENTS_TOTAL,
            Some(("scope", "in_cycle"))
        ),
        1
    );
}

#[test]
fn exhausted_unscoped_adjustment_is_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("build runtime");
    let transport = Arc::new(MemoryTransport::new(4));
    let endpoint = Endpoint::builder(Arc::clone(&transport))
        .policy(AdjustmentPolicy::new().with("note", Truncate::new(8)))
        .build();

    metrics::with_local_recorder(&recorder, || {
        let outcome = runtime.block_on(endpoint.send(Envelope::new("note", vec![0; 32])));
        assert!(outcome.is_err());
    });

    let metrics = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter(
            &metrics,
            oversend_metrics::ADJUSTMENTS_EXHAUSTED_TOTAL,
            Some(("scope", "unscoped"))
        ),
        1
    );
}
