//! JSON transform step

use std::collections::HashSet;

use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::domain::workflow::{EXTRACTED_DATA_KEY, ExecutionContext, JsonTransformStep, WorkflowError};

fn filter(value: &Value, allowed: &HashSet<&str>) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(key, _)| allowed.contains(key.as_str()))
                .map(|(key, child)| (key.clone(), filter(child, allowed)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|item| filter(item, allowed)).collect()),
        other => other.clone(),
    }
}

/// Keep only allow-listed keys, at every depth, and store the result under
/// `extractedData`. Workflow-only fields are dropped.
pub fn execute_json_transform(
    step: &JsonTransformStep,
    context: &mut ExecutionContext,
) -> Result<Value, WorkflowError> {
    if step.fields.is_empty() {
        debug!("No transform fields configured, leaving data unchanged");
        return Ok(json!({"skipped": true}));
    }

    let allowed: HashSet<&str> = step
        .fields
        .iter()
        .filter(|field| !field.is_workflow_only)
        .map(|field| field.field_name.as_str())
        .collect();

    let filtered = filter(context.extracted_data(), &allowed);
    let kept = filtered.as_object().map(Map::len).unwrap_or_default();

    info!(
        allowed_fields = allowed.len(),
        kept_top_level = kept,
        "Extracted data filtered"
    );

    context.set(EXTRACTED_DATA_KEY, filtered.clone());
    Ok(json!({ EXTRACTED_DATA_KEY: filtered }))
}
