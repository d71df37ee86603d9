//! Trait contract tests for GradingEventStore.
//!
//! These tests verify the behavioral contract of the store using the
//! in-memory implementation. Any conforming backend must pass these.

use std::sync::Arc;

use chrono::Utc;
use gradeloop_ledger::storage_traits::*;
use gradeloop_ledger::{MemoryGradingEventStore, StorageError};

fn event(key: &str, trace: &str, attempt: u32, decision: DecisionOutcome) -> GradingEvent {
    GradingEvent {
        message_id: format!("{trace}-msg-{attempt}"),
        trace_id: trace.to_string(),
        attempt_no: attempt,
        decision,
        qscore: 0.5,
        reasons: vec![],
        idempotency_key: key.to_string(),
        created_at: Utc::now(),
        specialist_id: "specialist-default".to_string(),
        context_result: None,
    }
}

// ===========================================================================
// At-most-once writes
// ===========================================================================

#[tokio::test]
async fn record_rejects_duplicate_key() {
    let store = MemoryGradingEventStore::new();
    store
        .record(event("dup", "t1", 0, DecisionOutcome::Retry))
        .await
        .unwrap();

    let mut second = event("dup", "t1", 0, DecisionOutcome::Accept);
    second.qscore = 0.99;
    let err = store.record(second).await.unwrap_err();

    assert!(matches!(err, StorageError::IdempotencyViolation { ref key } if key == "dup"));
}

#[tokio::test]
async fn duplicate_write_leaves_only_first_event_visible() {
    let store = MemoryGradingEventStore::new();
    store
        .record(event("dup", "t1", 0, DecisionOutcome::Retry))
        .await
        .unwrap();
    let _ = store
        .record(event("dup", "t1", 0, DecisionOutcome::Accept))
        .await;

    assert_eq!(store.count(None).await.unwrap(), 1);
    assert_eq!(store.count(Some(DecisionOutcome::Accept)).await.unwrap(), 0);
    let all = store.query(&EventQuery::new()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].decision, DecisionOutcome::Retry);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_records_admit_exactly_one() {
    let store: Arc<dyn GradingEventStore> = Arc::new(MemoryGradingEventStore::new());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .record(event("race", "t-race", 0, DecisionOutcome::Retry))
                    .await
            })
        })
        .collect();

    let mut ok = 0;
    let mut violations = 0;
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(()) => ok += 1,
            Err(StorageError::IdempotencyViolation { .. }) => violations += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(violations, 15);
    assert_eq!(store.count(None).await.unwrap(), 1);
}

// ===========================================================================
// Lookups
// ===========================================================================

#[tokio::test]
async fn get_by_message_id_returns_matching_events() {
    let store = MemoryGradingEventStore::new();
    store
        .record(event("a", "t1", 0, DecisionOutcome::Retry))
        .await
        .unwrap();
    store
        .record(event("b", "t2", 0, DecisionOutcome::Accept))
        .await
        .unwrap();

    let found = store.get_by_message_id("t1-msg-0").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].idempotency_key, "a");
}

#[tokio::test]
async fn trace_events_ordered_by_attempt_and_latest_is_highest() {
    let store = MemoryGradingEventStore::new();
    for (key, attempt) in [("k3", 3), ("k1", 1), ("k2", 2)] {
        store
            .record(event(key, "t1", attempt, DecisionOutcome::Retry))
            .await
            .unwrap();
    }
    store
        .record(event("other", "t2", 9, DecisionOutcome::Retry))
        .await
        .unwrap();

    let trace = store.get_by_trace_id("t1").await.unwrap();
    let attempts: Vec<u32> = trace.iter().map(|e| e.attempt_no).collect();
    assert_eq!(attempts, vec![1, 2, 3]);

    let latest = store.get_latest_by_trace_id("t1").await.unwrap().unwrap();
    assert_eq!(latest.attempt_no, 3);
}

#[tokio::test]
async fn count_and_query_filters() {
    let store = MemoryGradingEventStore::new();
    let mut accepted = event("a", "t1", 0, DecisionOutcome::Accept);
    accepted.qscore = 0.9;
    let mut escalated = event("b", "t2", 3, DecisionOutcome::Escalate);
    escalated.qscore = 0.2;
    escalated.specialist_id = "specialist-advanced".to_string();
    let retried = event("c", "t3", 1, DecisionOutcome::Retry);

    for e in [accepted, escalated, retried] {
        store.record(e).await.unwrap();
    }

    assert_eq!(store.count(None).await.unwrap(), 3);
    assert_eq!(store.count(Some(DecisionOutcome::Escalate)).await.unwrap(), 1);

    let high = store
        .query(&EventQuery::new().min_qscore(0.5))
        .await
        .unwrap();
    assert_eq!(high.len(), 2);

    let advanced = store
        .query(&EventQuery::new().specialist("specialist-advanced"))
        .await
        .unwrap();
    assert_eq!(advanced.len(), 1);
    assert_eq!(advanced[0].decision, DecisionOutcome::Escalate);

    let none = store
        .query(
            &EventQuery::new()
                .decision(DecisionOutcome::Accept)
                .specialist("specialist-advanced"),
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}
