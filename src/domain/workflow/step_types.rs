//! Workflow step type definitions
//!
//! Step records store their configuration as a JSON blob next to a
//! `step_type` discriminator. Each discriminator maps to one typed config
//! struct here; configs use camelCase keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::notification::NotificationType;

/// Type of workflow step, with its configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "step_type", content = "config", rename_all = "snake_case")]
pub enum WorkflowStepType {
    /// Generic HTTP call to an arbitrary URL
    ApiCall(ApiCallStep),

    /// Call to a catalogued endpoint of a configured API
    ApiEndpoint(ApiEndpointStep),

    /// Evaluate a condition and record the result in the context
    #[serde(alias = "conditional")]
    ConditionalCheck(ConditionalCheckStep),

    /// Filter extracted fields down to an allow-list
    JsonTransform(JsonTransformStep),

    /// Compute output filenames
    #[serde(alias = "rename_file")]
    Rename(RenameStep),

    /// Send an ad hoc email
    #[serde(alias = "send_email")]
    EmailAction(EmailActionStep),

    /// Send an email from a stored notification template
    Notification(NotificationStep),
}

impl WorkflowStepType {
    /// Get a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ApiCall(_) => "api_call",
            Self::ApiEndpoint(_) => "api_endpoint",
            Self::ConditionalCheck(_) => "conditional_check",
            Self::JsonTransform(_) => "json_transform",
            Self::Rename(_) => "rename",
            Self::EmailAction(_) => "email_action",
            Self::Notification(_) => "notification",
        }
    }

    /// Build a step type from the discriminator and config blob of a step record
    pub fn from_parts(step_type: &str, config: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({
            "step_type": step_type,
            "config": config,
        }))
    }
}

/// HTTP request method
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    GET,
    #[serde(alias = "post")]
    POST,
    #[serde(alias = "put")]
    PUT,
    #[serde(alias = "patch")]
    PATCH,
    #[serde(alias = "delete")]
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::PATCH => "PATCH",
            Self::DELETE => "DELETE",
        }
    }

    /// Whether a request body may be sent with this method
    pub fn allows_body(&self) -> bool {
        !matches!(self, Self::GET)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Copies one value of an API response into the context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDataMapping {
    /// Path inside the response body
    pub response_path: String,

    /// Context path to write to
    pub update_path: String,
}

impl ResponseDataMapping {
    pub fn new(response_path: impl Into<String>, update_path: impl Into<String>) -> Self {
        Self {
            response_path: response_path.into(),
            update_path: update_path.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Generic API call step configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallStep {
    /// Target URL; `{{path}}` values are URL-encoded
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Header values may contain placeholders
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// JSON body template, either a string or a JSON value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,

    /// Double single quotes in substituted body values
    #[serde(default)]
    pub escape_single_quotes_in_body: bool,

    /// OData-escape substituted URL values before encoding them
    #[serde(
        default = "default_true",
        rename = "escapeODataInUrl",
        alias = "escapeOdataInUrl"
    )]
    pub escape_odata_in_url: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_data_mappings: Vec<ResponseDataMapping>,
}

impl ApiCallStep {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::GET,
            headers: HashMap::new(),
            request_body: None,
            escape_single_quotes_in_body: false,
            escape_odata_in_url: true,
            response_data_mappings: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(Value::String(body.into()));
        self
    }

    pub fn with_escape_single_quotes(mut self, escape: bool) -> Self {
        self.escape_single_quotes_in_body = escape;
        self
    }

    pub fn with_mapping(mut self, mapping: ResponseDataMapping) -> Self {
        self.response_data_mappings.push(mapping);
        self
    }

    /// The body template as text, whatever form it was stored in
    pub fn body_template(&self) -> Option<String> {
        match &self.request_body {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Which configured API an endpoint step talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiSource {
    /// The primary API settings
    #[default]
    Main,
    /// A secondary API selected by id
    Secondary,
}

/// One query parameter of an endpoint call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: String,

    /// Value template; may use `{{path}}`, `{var}` or `${var}`
    #[serde(default)]
    pub value: String,
}

impl QueryParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Where a body field value comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Literal value from the config (placeholders allowed)
    #[default]
    Hardcoded,
    /// Context path lookup
    Variable,
}

/// Type a body field value is coerced to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

/// Maps a value into the request body at a JSON path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyFieldMapping {
    /// Dotted path inside the body object
    pub field_path: String,

    #[serde(default)]
    pub source: ValueSource,

    /// Literal value or context path, depending on `source`
    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub target_type: TargetType,
}

impl BodyFieldMapping {
    pub fn hardcoded(field_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            source: ValueSource::Hardcoded,
            value: value.into(),
            target_type: TargetType::String,
        }
    }

    pub fn variable(field_path: impl Into<String>, context_path: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            source: ValueSource::Variable,
            value: context_path.into(),
            target_type: TargetType::String,
        }
    }

    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }
}

/// Named/catalogued API endpoint step configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpointStep {
    #[serde(default)]
    pub api_source: ApiSource,

    /// Required when `api_source` is `secondary`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_api_id: Option<String>,

    #[serde(default)]
    pub method: HttpMethod,

    /// Path appended to the base URL, e.g. `/customers/{customerId}`
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryParameter>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_fields: Vec<BodyFieldMapping>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_data_mappings: Vec<ResponseDataMapping>,
}

impl ApiEndpointStep {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            api_source: ApiSource::Main,
            secondary_api_id: None,
            method: HttpMethod::GET,
            path: path.into(),
            query_parameters: Vec::new(),
            headers: HashMap::new(),
            body_fields: Vec::new(),
            response_data_mappings: Vec::new(),
        }
    }

    pub fn with_secondary_api(mut self, id: impl Into<String>) -> Self {
        self.api_source = ApiSource::Secondary;
        self.secondary_api_id = Some(id.into());
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters.push(QueryParameter::new(name, value));
        self
    }

    pub fn with_body_field(mut self, field: BodyFieldMapping) -> Self {
        self.body_fields.push(field);
        self
    }

    pub fn with_mapping(mut self, mapping: ResponseDataMapping) -> Self {
        self.response_data_mappings.push(mapping);
        self
    }
}

/// Condition comparison operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Exists,
    NotExists,
    IsNull,
    IsNotNull,
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl ConditionOperator {
    /// Evaluate the operator; never fails, mismatched operands give `false`
    pub fn evaluate(&self, actual: Option<&Value>, expected: Option<&Value>) -> bool {
        let present = actual.is_some_and(|v| !v.is_null());

        match self {
            Self::Exists | Self::IsNotNull => present,
            Self::NotExists | Self::IsNull => !present,
            Self::Equals => equals(actual, expected),
            Self::NotEquals => !equals(actual, expected),
            Self::Contains => contains(actual, expected),
            Self::NotContains => !contains(actual, expected),
            Self::GreaterThan => compare_numbers(actual, expected, |a, b| a > b),
            Self::GreaterThanOrEqual => compare_numbers(actual, expected, |a, b| a >= b),
            Self::LessThan => compare_numbers(actual, expected, |a, b| a < b),
            Self::LessThanOrEqual => compare_numbers(actual, expected, |a, b| a <= b),
        }
    }
}

/// Loose string form used for comparisons
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn equals(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual.and_then(as_text), expected.and_then(as_text)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        _ => false,
    }
}

fn contains(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let Some(needle) = expected.and_then(as_text) else {
        return false;
    };

    match actual {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| as_text(item).is_some_and(|text| text == needle)),
        Some(value) => as_text(value).is_some_and(|text| text.contains(&needle)),
        None => false,
    }
}

fn compare_numbers<F>(actual: Option<&Value>, expected: Option<&Value>, f: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => f(a, b),
        _ => false,
    }
}

/// Conditional check step configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalCheckStep {
    /// Context path of the value under test
    pub field_path: String,

    pub operator: ConditionOperator,

    /// Comparison value; string values may contain placeholders
    #[serde(default, alias = "expectedValue", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Context key for the result; defaults to `condition_<stepOrder>_result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_key: Option<String>,
}

impl ConditionalCheckStep {
    pub fn new(field_path: impl Into<String>, operator: ConditionOperator) -> Self {
        Self {
            field_path: field_path.into(),
            operator,
            value: None,
            result_key: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }

    /// Context key the result is stored under
    pub fn result_key_for(&self, step_order: u32) -> String {
        match &self.result_key {
            Some(key) if !key.trim().is_empty() => key.clone(),
            _ => format!("condition_{}_result", step_order),
        }
    }
}

/// A field of the transform allow-list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransformField {
    pub field_name: String,

    /// Workflow-only fields are used by steps but dropped from output data
    #[serde(default)]
    pub is_workflow_only: bool,
}

impl TransformField {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            is_workflow_only: false,
        }
    }

    pub fn workflow_only(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            is_workflow_only: true,
        }
    }
}

/// JSON transform step configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonTransformStep {
    #[serde(default)]
    pub fields: Vec<TransformField>,
}

/// Timestamp formats a renamed file can carry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    #[default]
    #[serde(rename = "YYYYMMDD")]
    Compact,
    #[serde(rename = "YYYY-MM-DD")]
    Dashed,
    #[serde(rename = "YYYYMMDD_HHMMSS")]
    CompactWithTime,
    #[serde(rename = "YYYY-MM-DD_HH-MM-SS")]
    DashedWithTime,
}

impl TimestampFormat {
    /// chrono format string
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Compact => "%Y%m%d",
            Self::Dashed => "%Y-%m-%d",
            Self::CompactWithTime => "%Y%m%d_%H%M%S",
            Self::DashedWithTime => "%Y-%m-%d_%H-%M-%S",
        }
    }
}

/// Output types a rename step produces filenames for
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutputTypes {
    #[serde(default)]
    pub pdf: bool,
    #[serde(default)]
    pub csv: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub xml: bool,
}

/// Rename step configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenameStep {
    /// Step-level template; takes precedence over document templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_template: Option<String>,

    #[serde(default)]
    pub append_timestamp: bool,

    #[serde(default)]
    pub timestamp_format: TimestampFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_types: Option<OutputTypes>,
}

impl RenameStep {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            filename_template: Some(template.into()),
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, format: TimestampFormat) -> Self {
        self.append_timestamp = true;
        self.timestamp_format = format;
        self
    }

    pub fn with_output_types(mut self, output_types: OutputTypes) -> Self {
        self.output_types = Some(output_types);
        self
    }
}

/// Strategies for choosing the attachment filename
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSource {
    /// Filename computed by an earlier rename step
    RenamedPdfStep,
    /// Filename from the extraction type's transform setup
    TransformSetupPdf,
    /// The uploaded filename
    OriginalPdf,
    /// The extraction type filename template, resolved against the context
    ExtractionTypeFilename,
}

/// Which part of the grouped PDF gets attached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PdfEmailStrategy {
    #[default]
    AllPagesInGroup,
    SpecificPageInGroup,
}

/// PDF attachment options shared by email steps
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentOptions {
    #[serde(default)]
    pub attach_pdf: bool,

    /// Tried in order; the first one with a value wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_sources: Vec<AttachmentSource>,

    #[serde(default)]
    pub pdf_email_strategy: PdfEmailStrategy,

    /// 1-based page; a number or a placeholder template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<Value>,
}

/// Ad hoc email step configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailActionStep {
    /// Comma or semicolon separated recipients
    pub to: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,

    pub subject: String,

    #[serde(default)]
    pub body: String,

    /// Sender; the provider's default sender when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default = "default_true")]
    pub is_html: bool,

    #[serde(flatten)]
    pub attachment: AttachmentOptions,

    /// CC the user who submitted the document
    #[serde(default)]
    pub cc_user: bool,

    /// Explicit user id (template) to CC instead of the submitter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_user_id: Option<String>,
}

impl EmailActionStep {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            cc: None,
            bcc: None,
            subject: subject.into(),
            body: body.into(),
            from: None,
            is_html: true,
            attachment: AttachmentOptions::default(),
            cc_user: false,
            cc_user_id: None,
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentOptions) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn with_cc_user(mut self) -> Self {
        self.cc_user = true;
        self
    }
}

/// Notification step configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStep {
    /// Stored template to use; the global default of `notification_type` otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    #[serde(default)]
    pub notification_type: NotificationType,

    /// Overrides the template's recipient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,

    /// Extra substitution values: name -> template resolved against the context
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_field_mappings: HashMap<String, String>,

    #[serde(flatten)]
    pub attachment: AttachmentOptions,
}

impl NotificationStep {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: Some(template_id.into()),
            notification_type: NotificationType::Success,
            recipient_email: None,
            custom_field_mappings: HashMap::new(),
            attachment: AttachmentOptions::default(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.custom_field_mappings.insert(name.into(), template.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_type_from_parts() {
        let step = WorkflowStepType::from_parts(
            "api_call",
            json!({
                "url": "https://api.x.com/orders/{{orderId}}",
                "method": "post",
                "requestBody": {"id": "{{orderId}}"},
                "responseDataMappings": [{"responsePath": "data.id", "updatePath": "orderRef"}]
            }),
        )
        .unwrap();

        let WorkflowStepType::ApiCall(config) = step else {
            panic!("expected api_call");
        };
        assert_eq!(config.method, HttpMethod::POST);
        assert!(config.escape_odata_in_url);
        assert_eq!(config.body_template().unwrap(), r#"{"id":"{{orderId}}"}"#);
        assert_eq!(
            config.response_data_mappings,
            vec![ResponseDataMapping::new("data.id", "orderRef")]
        );
    }

    #[test]
    fn test_step_type_aliases() {
        let step = WorkflowStepType::from_parts(
            "conditional",
            json!({"fieldPath": "total", "operator": "greater_than", "expectedValue": 10}),
        )
        .unwrap();
        assert_eq!(step.type_name(), "conditional_check");

        let step = WorkflowStepType::from_parts("rename_file", json!({})).unwrap();
        assert_eq!(step.type_name(), "rename");
    }

    #[test]
    fn test_unknown_step_type_is_rejected() {
        assert!(WorkflowStepType::from_parts("sftp_upload", json!({})).is_err());
    }

    #[test]
    fn test_condition_operator_presence() {
        let value = json!("x");
        let null = Value::Null;

        assert!(ConditionOperator::Exists.evaluate(Some(&value), None));
        assert!(!ConditionOperator::Exists.evaluate(None, None));
        assert!(ConditionOperator::NotExists.evaluate(None, None));
        assert!(ConditionOperator::IsNull.evaluate(Some(&null), None));
        assert!(!ConditionOperator::IsNotNull.evaluate(Some(&null), None));
    }

    #[test]
    fn test_condition_operator_equals_uses_string_form() {
        assert!(ConditionOperator::Equals.evaluate(Some(&json!(42)), Some(&json!("42"))));
        assert!(ConditionOperator::Equals.evaluate(Some(&json!(true)), Some(&json!("true"))));
        assert!(ConditionOperator::NotEquals.evaluate(Some(&json!("a")), Some(&json!("b"))));
        assert!(!ConditionOperator::Equals.evaluate(None, Some(&json!("b"))));
    }

    #[test]
    fn test_condition_operator_contains() {
        let text = json!("Remittance advice");
        let list = json!(["a", "b", 3]);

        assert!(ConditionOperator::Contains.evaluate(Some(&text), Some(&json!("advice"))));
        assert!(ConditionOperator::NotContains.evaluate(Some(&text), Some(&json!("invoice"))));
        assert!(ConditionOperator::Contains.evaluate(Some(&list), Some(&json!("3"))));
        assert!(!ConditionOperator::Contains.evaluate(None, Some(&json!("a"))));
    }

    #[test]
    fn test_condition_operator_numeric() {
        assert!(ConditionOperator::GreaterThan.evaluate(Some(&json!("10.5")), Some(&json!(10))));
        assert!(ConditionOperator::GreaterThanOrEqual.evaluate(Some(&json!(10)), Some(&json!("10"))));
        assert!(ConditionOperator::LessThan.evaluate(Some(&json!(1)), Some(&json!(2))));
        assert!(ConditionOperator::LessThanOrEqual.evaluate(Some(&json!(2)), Some(&json!(2))));
    }

    #[test]
    fn test_numeric_operator_with_non_numeric_operand_is_false() {
        assert!(!ConditionOperator::GreaterThan.evaluate(Some(&json!("abc")), Some(&json!(1))));
        assert!(!ConditionOperator::LessThan.evaluate(Some(&json!(1)), Some(&json!("abc"))));
        assert!(!ConditionOperator::GreaterThan.evaluate(None, Some(&json!(1))));
    }

    #[test]
    fn test_conditional_result_key() {
        let step = ConditionalCheckStep::new("total", ConditionOperator::Exists);
        assert_eq!(step.result_key_for(3), "condition_3_result");

        let step = step.with_result_key("hasTotal");
        assert_eq!(step.result_key_for(3), "hasTotal");
    }

    #[test]
    fn test_email_action_flattened_attachment_options() {
        let step = WorkflowStepType::from_parts(
            "email_action",
            json!({
                "to": "ap@example.com",
                "subject": "Remit {{invoiceNumber}}",
                "attachPdf": true,
                "attachmentSources": ["renamed_pdf_step", "original_pdf"],
                "pdfEmailStrategy": "specific_page_in_group",
                "pageNumber": 2
            }),
        )
        .unwrap();

        let WorkflowStepType::EmailAction(config) = step else {
            panic!("expected email_action");
        };
        assert!(config.is_html);
        assert!(config.attachment.attach_pdf);
        assert_eq!(
            config.attachment.pdf_email_strategy,
            PdfEmailStrategy::SpecificPageInGroup
        );
        assert_eq!(config.attachment.page_number, Some(json!(2)));
        assert_eq!(config.attachment.attachment_sources.len(), 2);
    }

    #[test]
    fn test_timestamp_format_serialization() {
        let format: TimestampFormat = serde_json::from_value(json!("YYYY-MM-DD_HH-MM-SS")).unwrap();
        assert_eq!(format, TimestampFormat::DashedWithTime);
        assert_eq!(format.pattern(), "%Y-%m-%d_%H-%M-%S");
    }
}
