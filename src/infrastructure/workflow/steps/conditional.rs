//! Conditional check step

use serde_json::{Value, json};
use tracing::info;

use crate::domain::workflow::{ConditionalCheckStep, ExecutionContext, WorkflowError};

/// Evaluate the condition and store the boolean result in the context.
///
/// String comparison values may contain placeholders. Never halts the run.
pub fn execute_conditional(
    step: &ConditionalCheckStep,
    step_order: u32,
    context: &mut ExecutionContext,
) -> Result<Value, WorkflowError> {
    let expected = match &step.value {
        Some(Value::String(s)) => Some(Value::String(context.substitute(s))),
        other => other.clone(),
    };

    let actual = context.resolve(&step.field_path);
    let result = step.operator.evaluate(actual, expected.as_ref());
    let key = step.result_key_for(step_order);

    info!(
        step_order = step_order,
        field_path = %step.field_path,
        operator = ?step.operator,
        result = result,
        "Condition evaluated"
    );

    context.set(key.clone(), Value::Bool(result));

    Ok(json!({
        "resultKey": key,
        "result": result,
    }))
}
