//! Idempotency keys are stable under reason-code permutation and change
//! with every identity field.

use gradeloop_core::{generate_idempotency_key, IdempotencyParams, Task};
use serde_json::json;

fn task() -> Task {
    Task::new("test_triage")
        .with_input("suite", json!("checkout"))
        .with_input("retries", json!(2))
}

fn key(trace_id: &str, task: &Task, attempt_no: u32, codes: &[&str]) -> String {
    let reason_codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
    generate_idempotency_key(&IdempotencyParams {
        trace_id,
        task,
        attempt_no,
        reason_codes: &reason_codes,
    })
    .unwrap()
    .key
}

#[test]
fn reason_code_order_does_not_matter() {
    let t = task();
    let a = key("trace-1", &t, 0, &["SCHEMA_VIOLATION", "verifier:schema", "verifier:smoke"]);
    let b = key("trace-1", &t, 0, &["verifier:smoke", "SCHEMA_VIOLATION", "verifier:schema"]);
    assert_eq!(a, b);
}

#[test]
fn identical_inputs_yield_identical_keys() {
    assert_eq!(key("t", &task(), 1, &["TIMEOUT"]), key("t", &task(), 1, &["TIMEOUT"]));
}

#[test]
fn every_identity_field_changes_the_key() {
    let base_task = task();
    let base = key("trace-1", &base_task, 0, &["TIMEOUT"]);

    let other_inputs = task().with_input("suite", json!("payments"));
    let mut other_type = task();
    other_type.task_type = "flake_hunt".to_string();

    let variants = [
        key("trace-2", &base_task, 0, &["TIMEOUT"]),
        key("trace-1", &base_task, 1, &["TIMEOUT"]),
        key("trace-1", &other_inputs, 0, &["TIMEOUT"]),
        key("trace-1", &other_type, 0, &["TIMEOUT"]),
        key("trace-1", &base_task, 0, &["UNKNOWN"]),
        key("trace-1", &base_task, 0, &[]),
    ];
    for variant in &variants {
        assert_ne!(&base, variant);
    }
}

#[test]
fn integer_valued_floats_hash_like_integers() {
    let as_int = Task::new("t").with_input("retries", json!(2));
    let as_float = Task::new("t").with_input("retries", json!(2.0));
    assert_eq!(key("t", &as_int, 0, &[]), key("t", &as_float, 0, &[]));
}

#[test]
fn key_carries_trace_and_attempt() {
    let t = task();
    let k = generate_idempotency_key(&IdempotencyParams {
        trace_id: "trace-9",
        task: &t,
        attempt_no: 4,
        reason_codes: &[],
    })
    .unwrap();
    assert_eq!(k.trace_id, "trace-9");
    assert_eq!(k.attempt_no, 4);
    assert_eq!(k.key.len(), 64);
    assert_eq!(k.to_string(), k.key);
}
