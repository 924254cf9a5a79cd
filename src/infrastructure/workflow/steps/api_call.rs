//! Generic API call step

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::StepScope;
use super::response::apply_response;
use crate::domain::workflow::template::{has_placeholders, render_json_body, substitute_url};
use crate::domain::workflow::{ApiCallStep, ExecutionContext, WorkflowError};
use crate::infrastructure::http::{HttpClientTrait, HttpRequest};

#[derive(Debug, Clone)]
pub struct ApiCallExecutor {
    http: Arc<dyn HttpClientTrait>,
}

impl ApiCallExecutor {
    pub fn new(http: Arc<dyn HttpClientTrait>) -> Self {
        Self { http }
    }

    /// Build the outgoing request from the config and the current context
    pub fn build_request(step: &ApiCallStep, context: &ExecutionContext) -> HttpRequest {
        let url = substitute_url(&step.url, context, step.escape_odata_in_url);
        if has_placeholders(&url) {
            warn!(url = %url, "URL still contains unresolved placeholders");
        }

        let mut request = HttpRequest::new(step.method, url);
        for (key, value) in &step.headers {
            request = request.with_header(key.clone(), context.substitute(value));
        }

        if !step.method.allows_body() {
            return request;
        }

        if let Some(template) = step.body_template() {
            let body = render_json_body(&template, context, step.escape_single_quotes_in_body);
            if serde_json::from_str::<Value>(&body).is_err() {
                warn!("Rendered request body is not valid JSON");
            }
            if request.header("content-type").is_none() {
                request = request.with_header("Content-Type", "application/json");
            }
            request = request.with_json(body);
        }

        request
    }

    pub async fn execute(
        &self,
        step: &ApiCallStep,
        scope: &StepScope,
        context: &mut ExecutionContext,
    ) -> Result<Value, WorkflowError> {
        let request = Self::build_request(step, context);
        debug!(method = %request.method, url = %request.url, "Sending API call");

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| WorkflowError::external_call(None, e.to_string()))?;

        info!(
            step_order = scope.step_order,
            status = response.status,
            "API call completed"
        );

        apply_response(response, &step.response_data_mappings, scope.step_order, context)
    }
}
