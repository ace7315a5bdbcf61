//! Integration tests for the probe result pipeline:
//! result channel -> consolidator -> state <- aggregator -> snapshot.

mod common;

use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{failure_result, make_state, success_result, wait_for};
use dnswatch::server::{aggregate_loop, consolidate_loop, RESULT_CHANNEL_CAPACITY};

#[tokio::test]
async fn test_interleaved_results_under_concurrent_aggregation() {
    let state = make_state(&["a"]);
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

    let consolidator = tokio::spawn(consolidate_loop(state.clone(), rx, cancel.clone()));
    // Aggressive aggregation cadence to force interleaving with appends.
    let aggregator = tokio::spawn(aggregate_loop(
        state.clone(),
        Duration::from_millis(5),
        cancel.clone(),
    ));

    // 1,000 alternating successes (10ms) and failures (30ms). Sends block
    // when the channel is full, which is the intended backpressure.
    for i in 0..1000 {
        let result = if i % 2 == 0 {
            success_result("a", 10)
        } else {
            failure_result("a", 30)
        };
        tx.send(result).await.expect("consolidator alive");
    }
    drop(tx);

    // All 500 failures are recent, so none can be pruned; once the last
    // one is visible every prior result has been consolidated.
    assert!(
        wait_for(Duration::from_secs(5), || {
            state.recent_errors("a") == Some(500)
        })
        .await,
        "consolidator did not drain all results"
    );

    // Concurrent passes must never over-truncate or lose entries.
    state.aggregate(Utc::now());
    assert_eq!(state.history_len("a"), Some(180));
    assert_eq!(state.recent_errors("a"), Some(500));

    // Consistent snapshot: the 15m window covers the newest 180 entries,
    // an even split of 10ms and 30ms probes.
    let status = state.snapshot().remove(0);
    assert!((status.response_times["15m"] - 20.0).abs() < 1e-9);
    assert!(status.success_last.is_some());
    assert!(status.failure_last.is_some());
    assert_eq!(status.value, "192.0.2.1");
    assert_eq!(status.error_timestamps.len(), 500);

    cancel.cancel();
    let _ = consolidator.await;
    let _ = aggregator.await;
}

#[tokio::test]
async fn test_end_to_end_snapshot_for_healthy_and_failing_endpoints() {
    let state = make_state(&["a.example.com", "b.example.com"]);
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

    let consolidator = tokio::spawn(consolidate_loop(state.clone(), rx, cancel.clone()));

    for _ in 0..3 {
        tx.send(success_result("a.example.com", 10)).await.unwrap();
        tx.send(failure_result("b.example.com", 30)).await.unwrap();
    }
    drop(tx);

    assert!(
        wait_for(Duration::from_secs(5), || {
            state.history_len("a.example.com") == Some(3)
                && state.history_len("b.example.com") == Some(3)
        })
        .await
    );
    state.aggregate(Utc::now());

    let json = serde_json::to_value(state.snapshot()).unwrap();
    let array = json.as_array().unwrap();
    assert_eq!(array.len(), 2);

    let a = &array[0];
    assert_eq!(a["Endpoint"], "a.example.com");
    assert!(!a["SuccessLast"].is_null());
    assert!(a["FailureLast"].is_null());
    assert!((a["ResponseTimes"]["1m"].as_f64().unwrap() - 10.0).abs() < 1e-9);
    assert_eq!(a["Value"], "192.0.2.1");

    let b = &array[1];
    assert_eq!(b["Endpoint"], "b.example.com");
    assert!(b["SuccessLast"].is_null());
    assert!(!b["FailureLast"].is_null());
    assert_eq!(b["Value"], "");
    assert!(!b["ErrorTimestamps"].as_array().unwrap().is_empty());

    cancel.cancel();
    let _ = consolidator.await;
}

#[tokio::test]
async fn test_unknown_endpoint_results_are_discarded_quietly() {
    let state = make_state(&["a"]);
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

    let consolidator = tokio::spawn(consolidate_loop(state.clone(), rx, cancel.clone()));

    tx.send(success_result("ghost", 10)).await.unwrap();
    tx.send(success_result("a", 10)).await.unwrap();
    drop(tx);

    assert!(
        wait_for(Duration::from_secs(5), || {
            state.history_len("a") == Some(1)
        })
        .await
    );
    // The unmatched result left no trace anywhere in the store.
    assert_eq!(state.endpoint_count(), 1);
    assert_eq!(state.snapshot().len(), 1);

    cancel.cancel();
    let _ = consolidator.await;
}

#[tokio::test]
async fn test_consolidator_exits_when_channel_closes() {
    let state = make_state(&["a"]);
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<dnswatch::ProbeResult>(RESULT_CHANNEL_CAPACITY);

    let consolidator = tokio::spawn(consolidate_loop(state.clone(), rx, cancel.clone()));
    drop(tx);

    tokio::time::timeout(Duration::from_secs(1), consolidator)
        .await
        .expect("consolidator should exit on channel close")
        .unwrap();
}
