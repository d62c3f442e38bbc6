//! Result normalization — one canonical result shape for every transport.
//!
//! The server has shipped several response envelopes over its lifetime
//! (`data`-wrapped or bare, step collections under `step_results`, `steps`,
//! `executed_steps`, or `results`). [`normalize`] absorbs all of them: it is
//! total and never fails; an unrecognized shape degrades to a mostly-empty
//! but well-typed [`CanonicalResult`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome of one step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub execution_time_ms: Option<f64>,
}

/// The normalized, transport-independent execution outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub workflow_id: String,
    pub success: bool,
    pub total_execution_time_ms: f64,
    /// Keyed by `step_id`, in server document order.
    pub step_results: IndexMap<String, StepOutcome>,
    /// Best-effort "last meaningful text" of the terminal step.
    pub final_output: String,
}

/// Probe order for the step-result collection; first present key wins.
const STEP_COLLECTION_KEYS: [&str; 4] = ["step_results", "steps", "executed_steps", "results"];

/// Normalize a raw server body into the canonical shape.
///
/// `workflow_id` and `measured_ms` come from the call context and backfill
/// fields the server omitted.
pub fn normalize(raw: serde_json::Value, workflow_id: &str, measured_ms: f64) -> CanonicalResult {
    let body = unwrap_data(raw);

    let step_results = extract_steps(&body);

    let success = body
        .get("success")
        .and_then(|v| v.as_bool())
        .or_else(|| {
            body.get("status")
                .and_then(|v| v.as_str())
                .map(|s| s == "completed")
        })
        .unwrap_or_else(|| step_results.values().all(|step| step.success));

    let total_execution_time_ms = body
        .get("total_execution_time_ms")
        .and_then(|v| v.as_f64())
        .or_else(|| {
            // Older servers report seconds under `execution_time`.
            body.get("execution_time")
                .and_then(|v| v.as_f64())
                .map(|secs| secs * 1000.0)
        })
        .unwrap_or(measured_ms);

    let final_output = body
        .get("final_output")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            step_results
                .values()
                .rev()
                .find(|step| step.success && !step.output.is_empty())
                .map(|step| step.output.clone())
                .unwrap_or_default()
        });

    CanonicalResult {
        workflow_id: body
            .get("workflow_id")
            .and_then(|v| v.as_str())
            .unwrap_or(workflow_id)
            .to_string(),
        success,
        total_execution_time_ms,
        step_results,
        final_output,
    }
}

/// Unwrap one level of `data` envelope if present.
pub fn unwrap_data(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) => match map.shift_remove("data") {
            Some(inner) if inner.is_object() || inner.is_array() => inner,
            Some(other) => {
                // A scalar `data` is not an envelope; keep the original body.
                map.insert("data".to_string(), other);
                serde_json::Value::Object(map)
            }
            None => serde_json::Value::Object(map),
        },
        other => other,
    }
}

fn extract_steps(body: &serde_json::Value) -> IndexMap<String, StepOutcome> {
    let collection = STEP_COLLECTION_KEYS.iter().find_map(|key| body.get(*key));

    match collection {
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(step_id, entry)| (step_id.clone(), outcome_from(entry)))
            .collect(),
        Some(serde_json::Value::Array(entries)) => {
            let mut steps = IndexMap::new();
            for (index, entry) in entries.iter().enumerate() {
                match entry {
                    serde_json::Value::Object(_) => {
                        let step_id = ["step_id", "id", "step_name", "name"]
                            .iter()
                            .find_map(|key| entry.get(*key).and_then(|v| v.as_str()))
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| format!("step_{}", index + 1));
                        steps.insert(step_id, outcome_from(entry));
                    }
                    // `executed_steps` can be a bare list of step ids; having
                    // executed is the only information carried.
                    serde_json::Value::String(step_id) => {
                        steps.insert(
                            step_id.clone(),
                            StepOutcome {
                                success: true,
                                ..StepOutcome::default()
                            },
                        );
                    }
                    _ => {}
                }
            }
            steps
        }
        _ => IndexMap::new(),
    }
}

fn outcome_from(entry: &serde_json::Value) -> StepOutcome {
    let success = entry
        .get("success")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let output = ["output", "result", "response", "text"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
        .or_else(|| {
            entry.get("result_data").map(|data| match data {
                serde_json::Value::String(s) => s.clone(),
                other => ["output", "response", "text"]
                    .iter()
                    .find_map(|key| other.get(*key).and_then(|v| v.as_str()))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| other.to_string()),
            })
        })
        .unwrap_or_default();

    let error = ["error", "error_message"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(|v| v.as_str()))
        .map(|s| s.to_string());

    let execution_time_ms = ["execution_time_ms", "duration_ms"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(|v| v.as_f64()));

    StepOutcome {
        success,
        output,
        error,
        execution_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_results_envelope() {
        let raw = serde_json::json!({
            "workflow_id": "w1",
            "success": true,
            "total_execution_time_ms": 1234.5,
            "step_results": {
                "s1": { "success": true, "output": "hello", "execution_time_ms": 200.0 }
            }
        });
        let result = normalize(raw, "fallback", 99.0);

        assert_eq!(result.workflow_id, "w1");
        assert!(result.success);
        assert_eq!(result.total_execution_time_ms, 1234.5);
        assert_eq!(result.step_results["s1"].output, "hello");
        assert_eq!(result.final_output, "hello");
    }

    #[test]
    fn test_data_envelope_unwrapped() {
        let raw = serde_json::json!({
            "data": {
                "success": true,
                "step_results": { "s1": { "success": true, "output": "x" } }
            }
        });
        let result = normalize(raw, "w1", 0.0);
        assert!(result.success);
        assert_eq!(result.step_results.len(), 1);
    }

    #[test]
    fn test_probe_order_first_key_wins() {
        let raw = serde_json::json!({
            "step_results": { "a": { "success": true, "output": "from step_results" } },
            "results": { "b": { "success": true, "output": "from results" } }
        });
        let result = normalize(raw, "w1", 0.0);
        assert!(result.step_results.contains_key("a"));
        assert!(!result.step_results.contains_key("b"));
    }

    #[test]
    fn test_alternative_envelope_keys() {
        for key in ["steps", "executed_steps", "results"] {
            let raw = serde_json::json!({
                key: { "s1": { "success": true, "output": "out" } }
            });
            let result = normalize(raw, "w1", 0.0);
            assert_eq!(result.step_results.len(), 1, "envelope key {key}");
            assert!(result.success, "envelope key {key}");
        }
    }

    #[test]
    fn test_array_collection_with_step_objects() {
        let raw = serde_json::json!({
            "executed_steps": [
                { "step_id": "s1", "success": true, "output": "one" },
                { "step_id": "s2", "success": false, "error_message": "boom" }
            ]
        });
        let result = normalize(raw, "w1", 0.0);
        assert_eq!(result.step_results.len(), 2);
        assert!(result.step_results["s1"].success);
        assert_eq!(result.step_results["s2"].error.as_deref(), Some("boom"));
        assert!(!result.success);
    }

    #[test]
    fn test_bare_step_id_list() {
        let raw = serde_json::json!({ "executed_steps": ["s1", "s2"] });
        let result = normalize(raw, "w1", 0.0);
        assert_eq!(result.step_results.len(), 2);
        assert!(result.step_results["s2"].success);
    }

    #[test]
    fn test_no_collection_is_not_an_error() {
        let result = normalize(serde_json::json!({ "success": true }), "w1", 42.0);
        assert!(result.success);
        assert!(result.step_results.is_empty());
        assert_eq!(result.total_execution_time_ms, 42.0);
        assert_eq!(result.final_output, "");
    }

    #[test]
    fn test_totality_on_garbage() {
        for raw in [
            serde_json::json!(null),
            serde_json::json!("not an object"),
            serde_json::json!([1, 2, 3]),
            serde_json::json!({ "steps": 7 }),
        ] {
            let result = normalize(raw, "w1", 5.0);
            assert_eq!(result.workflow_id, "w1");
            assert!(result.step_results.is_empty());
        }
    }

    #[test]
    fn test_final_output_prefers_explicit_field() {
        let raw = serde_json::json!({
            "final_output": "explicit",
            "step_results": { "s1": { "success": true, "output": "implicit" } }
        });
        assert_eq!(normalize(raw, "w1", 0.0).final_output, "explicit");
    }

    #[test]
    fn test_final_output_falls_back_to_last_successful_step() {
        // Document order matters: "zeta" comes first, "alpha" last.
        let raw = serde_json::json!({
            "step_results": {
                "zeta": { "success": true, "output": "first" },
                "mid": { "success": false, "output": "failed" },
                "alpha": { "success": true, "output": "last" }
            }
        });
        assert_eq!(normalize(raw, "w1", 0.0).final_output, "last");
    }

    #[test]
    fn test_execution_time_seconds_converted() {
        let raw = serde_json::json!({ "execution_time": 1.5 });
        assert_eq!(normalize(raw, "w1", 0.0).total_execution_time_ms, 1500.0);
    }

    #[test]
    fn test_status_string_maps_to_success() {
        let raw = serde_json::json!({ "status": "completed" });
        assert!(normalize(raw, "w1", 0.0).success);
        let raw = serde_json::json!({ "status": "failed" });
        assert!(!normalize(raw, "w1", 0.0).success);
    }

    #[test]
    fn test_result_data_object_output() {
        let raw = serde_json::json!({
            "step_results": {
                "s1": { "success": true, "result_data": { "response": "inner text" } }
            }
        });
        assert_eq!(normalize(raw, "w1", 0.0).step_results["s1"].output, "inner text");
    }

    #[test]
    fn test_scalar_data_is_not_an_envelope() {
        let raw = serde_json::json!({ "data": "exec_42", "success": true });
        let result = normalize(raw, "w1", 0.0);
        assert!(result.success);
    }
}
