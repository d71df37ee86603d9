//! Structural contract check for specialist results.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{VerificationResult, Verifier};
use crate::domain::DecisionInput;

pub const SCHEMA_VERIFIER: &str = "schema";

/// Structural contract a result must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedSchema {
    /// Top-level fields that must be present.
    pub required_fields: Vec<String>,
    pub min_summary_items: usize,
    /// Fields each affordance must carry as non-empty strings.
    pub affordance_fields: Vec<String>,
}

impl Default for ExpectedSchema {
    fn default() -> Self {
        Self {
            required_fields: vec!["summary".to_string(), "affordances".to_string()],
            min_summary_items: 1,
            affordance_fields: vec!["action".to_string(), "why".to_string()],
        }
    }
}

impl ExpectedSchema {
    /// Default contract plus extra required top-level fields.
    pub fn requiring<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for field in fields {
            let field = field.into();
            if !schema.required_fields.contains(&field) {
                schema.required_fields.push(field);
            }
        }
        schema
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate raw JSON against `schema`, returning every violation found.
///
/// Accepts any value, including `null`; never panics.
pub fn validate_context_value(value: &Value, schema: &ExpectedSchema) -> Vec<String> {
    let Some(obj) = value.as_object() else {
        return vec![format!(
            "contextResult must be an object (got {})",
            type_name(value)
        )];
    };

    let mut errors = Vec::new();
    for field in &schema.required_fields {
        match obj.get(field) {
            None | Some(Value::Null) => errors.push(format!("missing required field `{field}`")),
            Some(_) => {}
        }
    }

    match obj.get("summary") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            if items.len() < schema.min_summary_items {
                errors.push(format!(
                    "summary must contain at least {} item(s), found {}",
                    schema.min_summary_items,
                    items.len()
                ));
            }
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    errors.push(format!(
                        "summary[{i}] must be a string (got {})",
                        type_name(item)
                    ));
                }
            }
        }
        Some(other) => errors.push(format!(
            "summary must be an array of strings (got {})",
            type_name(other)
        )),
    }

    match obj.get("affordances") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let Some(aff) = item.as_object() else {
                    errors.push(format!(
                        "affordances[{i}] must be an object (got {})",
                        type_name(item)
                    ));
                    continue;
                };
                for field in &schema.affordance_fields {
                    let ok = aff
                        .get(field)
                        .and_then(Value::as_str)
                        .is_some_and(|s| !s.trim().is_empty());
                    if !ok {
                        errors.push(format!("affordances[{i}].{field} must be a non-empty string"));
                    }
                }
            }
        }
        Some(other) => errors.push(format!(
            "affordances must be an array (got {})",
            type_name(other)
        )),
    }

    errors
}

/// Checks `contextResult` against the input's `expectedSchema`, or the
/// verifier's default contract when none is supplied.
#[derive(Debug, Clone, Default)]
pub struct SchemaVerifier {
    default_schema: ExpectedSchema,
}

impl SchemaVerifier {
    pub fn new(default_schema: ExpectedSchema) -> Self {
        Self { default_schema }
    }

    /// Validate a raw value and build the verifier result.
    pub fn check_value(&self, value: &Value, schema: &ExpectedSchema) -> VerificationResult {
        let errors = validate_context_value(value, schema);
        let schema_json = serde_json::to_value(schema).unwrap_or(Value::Null);

        let result = match errors.as_slice() {
            [] => VerificationResult::pass(SCHEMA_VERIFIER, 1.0, "Schema validation passed"),
            [only] => VerificationResult::fail(
                SCHEMA_VERIFIER,
                1.0,
                format!("Schema validation failed: {only}"),
            ),
            [first, rest @ ..] => VerificationResult::fail(
                SCHEMA_VERIFIER,
                1.0,
                format!(
                    "Schema validation failed: {first} (+{} more)",
                    rest.len()
                ),
            ),
        };
        result
            .with_evidence("errors", serde_json::json!(errors))
            .with_evidence("schema", schema_json)
    }
}

#[async_trait]
impl Verifier for SchemaVerifier {
    fn name(&self) -> &str {
        SCHEMA_VERIFIER
    }

    async fn verify(&self, input: &DecisionInput, _timeout: Duration) -> VerificationResult {
        let schema = input
            .expected_schema
            .as_ref()
            .unwrap_or(&self.default_schema);
        match serde_json::to_value(&input.context_result) {
            Ok(value) => self.check_value(&value, schema),
            Err(e) => VerificationResult::fail(
                SCHEMA_VERIFIER,
                1.0,
                format!("Schema validation failed: contextResult is not serializable: {e}"),
            )
            .with_evidence("errors", serde_json::json!([e.to_string()])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_value_has_no_errors() {
        let v = json!({"summary": ["ok"], "affordances": [{"action": "a", "why": "b"}]});
        assert!(validate_context_value(&v, &ExpectedSchema::default()).is_empty());
    }

    #[test]
    fn test_null_input_fails_gracefully() {
        let r = SchemaVerifier::default().check_value(&Value::Null, &ExpectedSchema::default());
        assert!(!r.passed);
        assert!(r.confidence > 0.0);
        assert!(r.reason.contains("must be an object"));
    }

    #[test]
    fn test_every_violation_is_listed() {
        let v = json!({"summary": [1, "x"], "affordances": [{"action": "", "why": "b"}, "bad"]});
        let errors = validate_context_value(&v, &ExpectedSchema::default());
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].contains("summary[0]"));
        assert!(errors[1].contains("affordances[0].action"));
        assert!(errors[2].contains("affordances[1]"));
    }

    #[test]
    fn test_expected_schema_requires_extra_fields() {
        let schema = ExpectedSchema::requiring(["root_cause"]);
        let v = json!({"summary": ["ok"], "affordances": []});
        let errors = validate_context_value(&v, &schema);
        assert_eq!(errors, vec!["missing required field `root_cause`"]);
    }

    #[test]
    fn test_multi_error_reason_counts_rest() {
        let v = json!({"summary": "nope", "affordances": 7});
        let r = SchemaVerifier::default().check_value(&v, &ExpectedSchema::default());
        assert!(r.reason.ends_with("(+1 more)"), "{}", r.reason);
        assert_eq!(r.evidence["errors"].as_array().unwrap().len(), 2);
        assert!(r.evidence["schema"].is_object());
    }
}
