//! Serializer — canonical JSON for the validated IR.
//!
//! Keys are sorted lexically at every mapping level (serde_json's default
//! object representation is ordered), arrays keep insertion order, and the
//! result is checked to round-trip back into a structurally equal spec.
//! A round-trip mismatch is an implementer bug, not a model bug, and is
//! never retried.

use crate::CompilerError;
use ac_core::ast::WorkflowSpec;

/// Canonicalize the spec to a stable JSON string and verify the round trip.
pub fn to_canonical_json(spec: &WorkflowSpec) -> Result<String, CompilerError> {
    // Going through Value sorts keys; serializing the struct directly would
    // keep field declaration order instead.
    let value = serde_json::to_value(spec).map_err(|e| CompilerError::Serialize(e.to_string()))?;
    let json = serde_json::to_string(&value).map_err(|e| CompilerError::Serialize(e.to_string()))?;

    let back: WorkflowSpec = serde_json::from_str(&json)
        .map_err(|e| CompilerError::Serialize(format!("canonical JSON does not parse: {e}")))?;
    if back != *spec {
        tracing::error!(workflow = %spec.name, "round-trip mismatch");
        return Err(CompilerError::RoundTrip(spec.name.clone()));
    }
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;
    use serde_json::json;

    fn spec() -> WorkflowSpec {
        let candidate = json!({
            "version": "1.0.0",
            "metadata": {"category": "finance", "author": "tests"},
            "name": "expense_approval",
            "description": "Approve expenses",
            "inputs": [{"name": "expense_id", "type": "string", "description": "id"}],
            "outputs": [{"name": "decision", "type": "string", "description": "result"}],
            "workflow": {
                "type": "sequential",
                "steps": [
                    {"type": "tool_call", "tool_name": "fetch_expense",
                     "parameters": {"id": "{{expense_id}}"}, "assigns_to": "expense"},
                    {"type": "tool_call", "tool_name": "record_decision",
                     "parameters": {"expense": "{{expense}}"}, "assigns_to": "decision"}
                ]
            }
        });
        validate(&candidate).unwrap().spec
    }

    #[test]
    fn round_trip_is_stable() {
        let spec = spec();
        let json = to_canonical_json(&spec).unwrap();
        let back: WorkflowSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn keys_are_sorted() {
        let json = to_canonical_json(&spec()).unwrap();
        // Lexically first top-level key leads regardless of struct field
        // order, and version precedes workflow at the tail.
        assert!(json.starts_with("{\"description\":"));
        let version = json.rfind("\"version\"").unwrap();
        let workflow = json.rfind("\"workflow\"").unwrap();
        assert!(version < workflow);
    }

    #[test]
    fn shuffled_input_produces_identical_output() {
        let spec = spec();
        let canonical = to_canonical_json(&spec).unwrap();

        // Re-parse from a differently ordered rendering and re-canonicalize.
        let value: serde_json::Value = serde_json::from_str(&canonical).unwrap();
        let pretty = serde_json::to_string_pretty(&value).unwrap();
        let reparsed: WorkflowSpec = serde_json::from_str(&pretty).unwrap();
        assert_eq!(to_canonical_json(&reparsed).unwrap(), canonical);
    }

    #[test]
    fn no_trailing_whitespace_or_nulls() {
        let json = to_canonical_json(&spec()).unwrap();
        assert_eq!(json, json.trim());
        assert!(!json.contains("null"));
    }
}
