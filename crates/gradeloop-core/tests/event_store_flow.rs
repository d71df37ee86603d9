//! Decisions recorded in the ledger, read back, and fed into the next
//! attempt's replay check.

use std::sync::Arc;

use gradeloop_core::verification::REPLAY_VERIFIER;
use gradeloop_core::{
    previous_result_from_event, record_decision, Affordance, ContextResult, DecisionInput,
    DecisionLoop, DecisionOutcome, EventQuery, GradingEventStore, Metadata,
    MemoryGradingEventStore, Task,
};

fn attempt(retry_depth: u32, summary: &[&str]) -> DecisionInput {
    DecisionInput::new(
        ContextResult::new(
            summary.iter().map(|s| s.to_string()).collect(),
            vec![Affordance::new("stabilise wait", "race on page load")],
        ),
        Task::new("test_triage").with_input("test", serde_json::json!("checkout_spec")),
        Metadata {
            message_id: format!("msg-{retry_depth}"),
            retry_depth,
            ..Metadata::default()
        },
    )
}

#[tokio::test]
async fn recording_twice_is_rejected() {
    let store = MemoryGradingEventStore::new();
    let lp = DecisionLoop::standard().unwrap();
    let input = attempt(0, &[]);
    let result = lp.decide(&input).await;

    let key = record_decision(&store, &result, &input, "trace-a", 0).await.unwrap();
    assert!(store.is_duplicate(&key.key).await.unwrap());

    let err = record_decision(&store, &result, &input, "trace-a", 0)
        .await
        .unwrap_err();
    assert!(err.is_idempotency_violation());
    assert_eq!(store.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn event_mirrors_decision() {
    let store = MemoryGradingEventStore::new();
    let lp = DecisionLoop::standard().unwrap();
    let input = attempt(0, &[]);
    let result = lp.decide(&input).await;
    record_decision(&store, &result, &input, "trace-b", 0).await.unwrap();

    let events = store.get_by_message_id("msg-0").await.unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.decision, DecisionOutcome::Retry);
    assert_eq!(event.qscore, result.qscore.calibrated);
    assert_eq!(event.reasons, result.reason_codes());
    assert_eq!(event.reasons[0], "SCHEMA_VIOLATION");
    assert_eq!(event.specialist_id, "specialist-default");

    let retries = store
        .query(&EventQuery::new().decision(DecisionOutcome::Retry))
        .await
        .unwrap();
    assert_eq!(retries.len(), 1);
}

#[tokio::test]
async fn latest_event_feeds_replay_verifier() {
    let store = MemoryGradingEventStore::new();
    let lp = DecisionLoop::standard().unwrap();
    let summary = ["checkout test times out waiting for cart", "cart request is slow"];

    let first = attempt(0, &summary);
    let first_result = lp.decide(&first).await;
    record_decision(&store, &first_result, &first, "trace-c", 0)
        .await
        .unwrap();

    let latest = store.get_latest_by_trace_id("trace-c").await.unwrap().unwrap();
    let previous = previous_result_from_event(&latest).unwrap();
    assert_eq!(previous, first.context_result);

    let second = attempt(1, &summary).with_previous(previous);
    let second_result = lp.decide(&second).await;
    let replay = second_result
        .verification
        .result_for(REPLAY_VERIFIER)
        .unwrap();
    assert!(replay.passed);
    assert_eq!(replay.evidence["consistency"].as_f64(), Some(1.0));

    record_decision(&store, &second_result, &second, "trace-c", 1)
        .await
        .unwrap();
    let trace = store.get_by_trace_id("trace-c").await.unwrap();
    assert_eq!(
        trace.iter().map(|e| e.attempt_no).collect::<Vec<_>>(),
        vec![0, 1]
    );
}

#[tokio::test]
async fn concurrent_records_of_one_attempt_race_safely() {
    let store = Arc::new(MemoryGradingEventStore::new());
    let lp = DecisionLoop::standard().unwrap();
    let input = attempt(0, &[]);
    let result = lp.decide(&input).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let result = result.clone();
        let input = input.clone();
        handles.push(tokio::spawn(async move {
            record_decision(store.as_ref(), &result, &input, "trace-d", 0).await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => assert!(e.is_idempotency_violation()),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(store.count(None).await.unwrap(), 1);
}
