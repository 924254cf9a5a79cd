//! Response handling shared by the API steps

use serde_json::{Value, json};
use tracing::warn;

use crate::domain::workflow::{
    ExecutionContext, ResponseDataMapping, WorkflowError, resolve_path,
};
use crate::infrastructure::http::HttpResponse;

/// Validate a response, store it in the context and apply the mappings.
///
/// Returns the step output: the parsed body and the context paths written.
pub fn apply_response(
    response: HttpResponse,
    mappings: &[ResponseDataMapping],
    step_order: u32,
    context: &mut ExecutionContext,
) -> Result<Value, WorkflowError> {
    if !response.is_success() {
        return Err(WorkflowError::external_call(Some(response.status), response.body));
    }

    if response.body.trim().is_empty() {
        return Err(WorkflowError::external_call(
            Some(response.status),
            "Response body is empty",
        ));
    }

    let parsed: Value = serde_json::from_str(&response.body).map_err(|e| {
        WorkflowError::external_call(
            Some(response.status),
            format!("Response is not valid JSON ({}): {}", e, response.body),
        )
    })?;

    let mut mapped = Vec::new();
    for mapping in mappings {
        match resolve_path(&parsed, &mapping.response_path) {
            Some(value) => match context.set_path(&mapping.update_path, value.clone()) {
                Ok(()) => mapped.push(mapping.update_path.clone()),
                Err(e) => warn!(
                    step_order = step_order,
                    update_path = %mapping.update_path,
                    error = %e,
                    "Update path cannot be written, mapping skipped"
                ),
            },
            None => warn!(
                step_order = step_order,
                response_path = %mapping.response_path,
                update_path = %mapping.update_path,
                "Response path not found, mapping skipped"
            ),
        }
    }

    context.set(format!("apiResponse_{}", step_order), parsed.clone());
    context.set_last_api_response(parsed.clone());

    Ok(json!({
        "status": response.status,
        "response": parsed,
        "mappedPaths": mapped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mappings_write_into_context() {
        let mut context = ExecutionContext::default();
        let response = HttpResponse::new(200, r#"{"data": {"items": [{"id": "C-1"}]}}"#);
        let mappings = vec![
            ResponseDataMapping::new("data.items[0].id", "customer.id"),
            ResponseDataMapping::new("data.missing", "ignored"),
        ];

        let output = apply_response(response, &mappings, 3, &mut context).unwrap();

        assert_eq!(context.resolve("customer.id"), Some(&json!("C-1")));
        assert!(context.get("ignored").is_none());
        assert_eq!(output["mappedPaths"], json!(["customer.id"]));
        assert_eq!(context.resolve("apiResponse_3.data.items[0].id"), Some(&json!("C-1")));
        assert!(context.last_api_response().is_some());
    }

    #[test]
    fn test_unwritable_update_path_is_skipped() {
        let mut context = ExecutionContext::from_value(json!({"lines": []}));
        let response = HttpResponse::new(200, r#"{"id": "C-1"}"#);
        let mappings = vec![
            ResponseDataMapping::new("id", "lines[18446744073709551615]"),
            ResponseDataMapping::new("id", "customerId"),
        ];

        let output = apply_response(response, &mappings, 1, &mut context).unwrap();

        assert_eq!(output["mappedPaths"], json!(["customerId"]));
        assert_eq!(context.get("lines"), Some(&json!([])));
    }

    #[test]
    fn test_error_status_is_fatal() {
        let mut context = ExecutionContext::default();
        let err = apply_response(HttpResponse::new(404, "nope"), &[], 1, &mut context).unwrap_err();

        assert_eq!(err, WorkflowError::external_call(Some(404), "nope"));
    }

    #[test]
    fn test_empty_and_non_json_bodies_are_fatal() {
        let mut context = ExecutionContext::default();

        let err = apply_response(HttpResponse::new(200, "  "), &[], 1, &mut context).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = apply_response(HttpResponse::new(200, "<html>"), &[], 1, &mut context).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
        assert!(context.last_api_response().is_none());
    }
}
