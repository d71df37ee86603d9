//! Decision input: the specialist result under review.

use serde::{Deserialize, Deserializer, Serialize};

use crate::verification::schema::ExpectedSchema;

/// One suggested next step in a specialist result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affordance {
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub why: String,
}

impl Affordance {
    pub fn new(action: impl Into<String>, why: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            why: why.into(),
        }
    }
}

/// Explicit `null` reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Structured output of a specialist.
///
/// Fields outside `summary` and `affordances` are kept in `extra` so an
/// [`ExpectedSchema`] can require them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub affordances: Vec<Affordance>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContextResult {
    pub fn new(summary: Vec<String>, affordances: Vec<Affordance>) -> Self {
        Self {
            summary,
            affordances,
            extra: serde_json::Map::new(),
        }
    }

    /// Summary lines joined with spaces, for text heuristics.
    pub fn summary_text(&self) -> String {
        self.summary.join(" ")
    }
}

/// The work item that produced the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            inputs: serde_json::Map::new(),
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    /// Numeric input, accepting JSON numbers only.
    pub fn input_f64(&self, key: &str) -> Option<f64> {
        self.inputs.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// Invocation metadata attached by the upstream layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub specialist_id: String,
    pub message_id: String,
    #[serde(default)]
    pub retry_depth: u32,
    #[serde(default)]
    pub total_latency_ms: u64,
    #[serde(default = "default_schema_valid")]
    pub schema_valid: bool,
}

fn default_schema_valid() -> bool {
    true
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            specialist_id: "specialist-default".to_string(),
            message_id: String::new(),
            retry_depth: 0,
            total_latency_ms: 0,
            schema_valid: true,
        }
    }
}

/// One evaluation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
    pub context_result: ContextResult,
    pub task: Task,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_result: Option<ContextResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_schema: Option<ExpectedSchema>,
}

impl DecisionInput {
    pub fn new(context_result: ContextResult, task: Task, metadata: Metadata) -> Self {
        Self {
            context_result,
            task,
            metadata,
            previous_result: None,
            expected_schema: None,
        }
    }

    pub fn with_previous(mut self, previous: ContextResult) -> Self {
        self.previous_result = Some(previous);
        self
    }

    pub fn with_expected_schema(mut self, schema: ExpectedSchema) -> Self {
        self.expected_schema = Some(schema);
        self
    }
}
