//! Idempotency keys for grading attempts.
//!
//! A key is the SHA-256 hex digest of a canonical JSON encoding of
//! `(trace_id, task.type, task.inputs, attempt_no, sorted reason_codes)`.
//! Canonical JSON sorts object keys by UTF-16 code units and writes
//! integer-valued floats as integers, so logically equal inputs always hash
//! the same.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::{Result, Task};

/// Identity of one logical grading attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    /// 64-character lowercase hex digest.
    pub key: String,
    pub trace_id: String,
    pub attempt_no: u32,
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IdempotencyParams<'a> {
    pub trace_id: &'a str,
    pub task: &'a Task,
    pub attempt_no: u32,
    pub reason_codes: &'a [String],
}

fn sort_keys_utf16(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), sort_keys_utf16(v));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys_utf16).collect()),
        other => other.clone(),
    }
}

fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_numbers(v)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(normalize_numbers).collect()),
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Value::Number(serde_json::Number::from(f as i64))
            }
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

/// Canonical compact JSON: normalize numbers, sort keys, no whitespace.
pub fn canonical_json(value: &Value) -> Result<String> {
    let normalized = normalize_numbers(value);
    Ok(serde_json::to_string(&sort_keys_utf16(&normalized))?)
}

/// Compute the idempotency key for one grading attempt.
///
/// Invariant under permutation of `reason_codes`; any change to the trace,
/// task type, task inputs or attempt number changes the key.
pub fn generate_idempotency_key(params: &IdempotencyParams<'_>) -> Result<IdempotencyKey> {
    let mut reason_codes: Vec<&str> = params.reason_codes.iter().map(String::as_str).collect();
    reason_codes.sort_unstable();

    let payload = serde_json::json!({
        "trace_id": params.trace_id,
        "task_type": params.task.task_type,
        "task_inputs": Value::Object(params.task.inputs.clone()),
        "attempt_no": params.attempt_no,
        "reason_codes": reason_codes,
    });
    let canonical = canonical_json(&payload)?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(IdempotencyKey {
        key: hex::encode(hasher.finalize()),
        trace_id: params.trace_id.to_string(),
        attempt_no: params.attempt_no,
    })
}
