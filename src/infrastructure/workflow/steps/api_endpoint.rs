//! Catalogued API endpoint step

use std::sync::Arc;

use serde_json::{Map, Number, Value};
use tracing::{debug, info, warn};

use super::StepScope;
use super::response::apply_response;
use crate::domain::store::{ApiSettings, ConfigurationRepository};
use crate::domain::workflow::template::{
    encode_uri_component, odata_escape_value, render, render_path_variables, substitute_url,
    value_to_string,
};
use crate::domain::workflow::{
    ApiEndpointStep, ApiSource, BodyFieldMapping, ExecutionContext, TargetType, ValueSource,
    WorkflowError, set_path,
};
use crate::infrastructure::http::{HttpClientTrait, HttpRequest};

/// Query parameters that keep OData syntax intact
const ODATA_PARAMETERS: [&str; 8] = [
    "$filter", "$select", "$orderby", "$expand", "$top", "$skip", "$count", "$search",
];

fn is_odata_parameter(name: &str) -> bool {
    ODATA_PARAMETERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Minimal encoding used for OData parameter values
fn encode_odata_query(value: &str) -> String {
    value.replace(' ', "%20").replace('#', "%23")
}

/// Coerce a value to the configured type; `None` when it cannot be converted
pub fn coerce(value: Value, target: TargetType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }

    match target {
        TargetType::String => value_to_string(&value).map(Value::String),
        TargetType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| Value::from(f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            Value::Bool(b) => Some(Value::from(*b as i64)),
            _ => None,
        },
        TargetType::Number => match &value {
            Value::Number(_) => Some(value),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
        TargetType::Boolean => match &value {
            Value::Bool(_) => Some(value),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}

#[derive(Debug, Clone)]
pub struct ApiEndpointExecutor {
    http: Arc<dyn HttpClientTrait>,
    config: Arc<dyn ConfigurationRepository>,
}

impl ApiEndpointExecutor {
    pub fn new(http: Arc<dyn HttpClientTrait>, config: Arc<dyn ConfigurationRepository>) -> Self {
        Self { http, config }
    }

    async fn settings(&self, step: &ApiEndpointStep) -> Result<ApiSettings, WorkflowError> {
        let settings = match step.api_source {
            ApiSource::Main => self.config.get_api_settings().await?,
            ApiSource::Secondary => {
                let id = step
                    .secondary_api_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        WorkflowError::configuration("secondaryApiId is required for a secondary API")
                    })?;
                let settings = self.config.get_secondary_api(id).await?.ok_or_else(|| {
                    WorkflowError::configuration(format!("Secondary API '{}' not found", id))
                })?;
                Some(settings)
            }
        };

        match settings {
            Some(settings) if !settings.base_url.trim().is_empty() => Ok(settings),
            _ => Err(WorkflowError::configuration("API base URL is not configured")),
        }
    }

    /// Resolve `{var}`, `${var}` and `{{path}}` in the endpoint path
    pub fn build_path(path: &str, context: &ExecutionContext) -> String {
        let path = render_path_variables(path, context, encode_uri_component);
        substitute_url(&path, context, false)
    }

    /// Build the encoded query string; parameters with empty values are dropped
    pub fn build_query(step: &ApiEndpointStep, context: &ExecutionContext) -> String {
        let lookup = |path: &str| context.resolve(path).cloned();
        let mut pairs = Vec::new();

        for param in &step.query_parameters {
            let name = param.name.trim();
            if name.is_empty() {
                continue;
            }

            let pair = if name.eq_ignore_ascii_case("$filter") {
                let value = render_path_variables(&param.value, context, odata_escape_value);
                let value = render(&value, lookup, odata_escape_value);
                (!value.trim().is_empty()).then(|| format!("{}={}", name, encode_odata_query(&value)))
            } else if is_odata_parameter(name) {
                let value = context.substitute(&context.substitute_path_variables(&param.value));
                (!value.trim().is_empty()).then(|| format!("{}={}", name, encode_odata_query(&value)))
            } else {
                let value = context.substitute(&context.substitute_path_variables(&param.value));
                (!value.trim().is_empty()).then(|| {
                    format!("{}={}", encode_uri_component(name), encode_uri_component(&value))
                })
            };

            match pair {
                Some(pair) => pairs.push(pair),
                None => debug!(parameter = %name, "Dropping query parameter with empty value"),
            }
        }

        pairs.join("&")
    }

    fn body_field_value(field: &BodyFieldMapping, context: &ExecutionContext) -> Value {
        let raw = match field.source {
            ValueSource::Hardcoded => Value::String(context.substitute(&field.value)),
            ValueSource::Variable => match context.resolve(&field.value) {
                Some(value) => value.clone(),
                None => {
                    warn!(
                        field_path = %field.field_path,
                        context_path = %field.value,
                        "Body field source not found in context"
                    );
                    Value::Null
                }
            },
        };

        coerce(raw, field.target_type).unwrap_or_else(|| {
            warn!(
                field_path = %field.field_path,
                target_type = ?field.target_type,
                "Body field value could not be coerced, sending null"
            );
            Value::Null
        })
    }

    /// Build the JSON body from the field mappings
    pub fn build_body(step: &ApiEndpointStep, context: &ExecutionContext) -> Option<Value> {
        if step.body_fields.is_empty() || !step.method.allows_body() {
            return None;
        }

        let mut body = Value::Object(Map::new());
        for field in &step.body_fields {
            let value = Self::body_field_value(field, context);
            if let Err(e) = set_path(&mut body, &field.field_path, value) {
                warn!(
                    field_path = %field.field_path,
                    error = %e,
                    "Body field path cannot be written, field skipped"
                );
            }
        }
        Some(body)
    }

    pub fn build_request(
        step: &ApiEndpointStep,
        settings: &ApiSettings,
        context: &ExecutionContext,
    ) -> HttpRequest {
        let base = settings.base_url.trim().trim_end_matches('/');
        let path = Self::build_path(step.path.trim(), context);
        let mut url = if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        };

        let query = Self::build_query(step, context);
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }

        let mut request = HttpRequest::new(step.method, url);
        for (key, value) in &step.headers {
            request = request.with_header(key.clone(), context.substitute(value));
        }

        if request.header("authorization").is_none() {
            if let Some(token) = settings.bearer_token() {
                request = request.with_header("Authorization", format!("Bearer {}", token));
            }
        }

        if let Some(body) = Self::build_body(step, context) {
            if request.header("content-type").is_none() {
                request = request.with_header("Content-Type", "application/json");
            }
            request = request.with_json(body.to_string());
        }

        request
    }

    pub async fn execute(
        &self,
        step: &ApiEndpointStep,
        scope: &StepScope,
        context: &mut ExecutionContext,
    ) -> Result<Value, WorkflowError> {
        let settings = self.settings(step).await?;
        let request = Self::build_request(step, &settings, context);
        debug!(method = %request.method, url = %request.url, "Calling API endpoint");

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| WorkflowError::external_call(None, e.to_string()))?;

        info!(
            step_order = scope.step_order,
            status = response.status,
            "API endpoint call completed"
        );

        apply_response(response, &step.response_data_mappings, scope.step_order, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::MockConfigurationRepository;
    use crate::domain::workflow::{HttpMethod, ResponseDataMapping};
    use crate::infrastructure::http::HttpBody;
    use crate::infrastructure::http::mock::MockHttpClient;
    use serde_json::json;

    fn context() -> ExecutionContext {
        ExecutionContext::from_value(json!({
            "customerId": "C 1",
            "name": "O'Brien (Ltd)",
            "total": "12.50",
            "qty": "3",
            "flag": "yes",
            "blank": ""
        }))
    }

    fn settings() -> ApiSettings {
        ApiSettings::new("https://erp.x.com/api/").with_token("tok")
    }

    #[test]
    fn test_path_variables_are_encoded() {
        let step = ApiEndpointStep::new("/customers/{customerId}/orders/${total}");
        let request = ApiEndpointExecutor::build_request(&step, &settings(), &context());

        assert_eq!(request.url, "https://erp.x.com/api/customers/C%201/orders/12.50");
        assert_eq!(request.header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_odata_filter_escapes_values_only() {
        let step = ApiEndpointStep::new("/customers")
            .with_query("$filter", "Name eq '{{name}}' and Id eq '{customerId}'")
            .with_query("$top", "1");

        let query = ApiEndpointExecutor::build_query(&step, &context());
        assert_eq!(
            query,
            "$filter=Name%20eq%20'O''Brien%20Ltd'%20and%20Id%20eq%20'C%201'&$top=1"
        );
    }

    #[test]
    fn test_regular_parameters_are_fully_encoded_and_empty_dropped() {
        let step = ApiEndpointStep::new("/search")
            .with_query("customer name", "{{name}}")
            .with_query("empty", "{{blank}}")
            .with_query("literal", "");

        let query = ApiEndpointExecutor::build_query(&step, &context());
        assert_eq!(query, "customer%20name=O'Brien%20(Ltd)");
    }

    #[test]
    fn test_body_fields_are_coerced() {
        let step = ApiEndpointStep::new("/orders")
            .with_method(HttpMethod::POST)
            .with_body_field(
                BodyFieldMapping::variable("order.total", "total").with_target_type(TargetType::Number),
            )
            .with_body_field(
                BodyFieldMapping::variable("order.qty", "qty").with_target_type(TargetType::Integer),
            )
            .with_body_field(
                BodyFieldMapping::variable("order.rush", "flag").with_target_type(TargetType::Boolean),
            )
            .with_body_field(BodyFieldMapping::hardcoded("source", "pdf-{{customerId}}"))
            .with_body_field(
                BodyFieldMapping::variable("bad", "name").with_target_type(TargetType::Integer),
            );

        let body = ApiEndpointExecutor::build_body(&step, &context()).unwrap();
        assert_eq!(
            body,
            json!({
                "order": {"total": 12.5, "qty": 3, "rush": true},
                "source": "pdf-C 1",
                "bad": null
            })
        );
    }

    #[test]
    fn test_body_field_with_unreachable_index_is_skipped() {
        let step = ApiEndpointStep::new("/orders")
            .with_method(HttpMethod::POST)
            .with_body_field(BodyFieldMapping::hardcoded("lines[4000000000].sku", "A"))
            .with_body_field(BodyFieldMapping::hardcoded("ref", "x"));

        let body = ApiEndpointExecutor::build_body(&step, &context()).unwrap();
        assert_eq!(body["ref"], json!("x"));
        assert_eq!(body["lines"], json!([]));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(json!(2.0), TargetType::Integer), Some(json!(2)));
        assert_eq!(coerce(json!(2.5), TargetType::Integer), None);
        assert_eq!(coerce(json!(7), TargetType::String), Some(json!("7")));
        assert_eq!(coerce(json!("maybe"), TargetType::Boolean), None);
        assert_eq!(coerce(Value::Null, TargetType::Number), Some(Value::Null));
    }

    #[tokio::test]
    async fn test_execute_against_secondary_api() {
        let mut repo = MockConfigurationRepository::new();
        repo.expect_get_secondary_api()
            .times(1)
            .returning(|_| Ok(Some(ApiSettings::new("https://erp.x.com"))));

        let http = Arc::new(MockHttpClient::new().with_json(
            "https://erp.x.com/customers/C%201",
            json!({"value": [{"No": "10000"}]}),
        ));
        let executor = ApiEndpointExecutor::new(http.clone(), Arc::new(repo));
        let step = ApiEndpointStep::new("/customers/{customerId}")
            .with_secondary_api("erp")
            .with_mapping(ResponseDataMapping::new("value[0].No", "customerNo"));

        let mut ctx = context();
        executor
            .execute(&step, &StepScope::new(4), &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.get("customerNo"), Some(&json!("10000")));
        assert!(http.last_request().unwrap().header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_missing_base_url_is_configuration_error() {
        let mut repo = MockConfigurationRepository::new();
        repo.expect_get_api_settings()
            .returning(|| Ok(Some(ApiSettings::new(""))));

        let executor = ApiEndpointExecutor::new(Arc::new(MockHttpClient::new()), Arc::new(repo));
        let err = executor
            .execute(&ApiEndpointStep::new("/x"), &StepScope::new(1), &mut context())
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::configuration("API base URL is not configured"));
    }

    #[tokio::test]
    async fn test_unknown_secondary_api_is_configuration_error() {
        let mut repo = MockConfigurationRepository::new();
        repo.expect_get_secondary_api()
            .times(1)
            .returning(|_| Ok(None));

        let http = Arc::new(MockHttpClient::new());
        let executor = ApiEndpointExecutor::new(http.clone(), Arc::new(repo));
        let step = ApiEndpointStep::new("/x").with_secondary_api("erp");

        let err = executor
            .execute(&step, &StepScope::new(1), &mut context())
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::configuration("Secondary API 'erp' not found"));
        assert!(http.last_request().is_none());
    }

    #[tokio::test]
    async fn test_secondary_without_id() {
        let repo = MockConfigurationRepository::new();
        let executor = ApiEndpointExecutor::new(Arc::new(MockHttpClient::new()), Arc::new(repo));
        let mut step = ApiEndpointStep::new("/x");
        step.api_source = ApiSource::Secondary;

        let err = executor
            .execute(&step, &StepScope::new(1), &mut context())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Configuration(_)));
    }

    #[test]
    fn test_post_body_sent_as_json() {
        let step = ApiEndpointStep::new("/orders")
            .with_method(HttpMethod::POST)
            .with_body_field(BodyFieldMapping::hardcoded("ref", "x"));

        let request = ApiEndpointExecutor::build_request(&step, &settings(), &context());
        assert_eq!(request.body, Some(HttpBody::Json(r#"{"ref":"x"}"#.to_string())));
        assert_eq!(request.header("content-type"), Some("application/json"));
    }
}
