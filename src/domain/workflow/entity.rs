//! Workflow domain entity

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WorkflowError;
use super::step_types::WorkflowStepType;

/// Maximum length for workflow IDs
pub const MAX_ID_LENGTH: usize = 64;

/// Regex pattern for valid workflow IDs: alphanumeric, hyphens and underscores
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*[a-zA-Z0-9]$|^[a-zA-Z0-9]$").unwrap()
});

/// Validated workflow identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Create a new validated workflow ID
    pub fn new(id: impl Into<String>) -> Result<Self, WorkflowError> {
        let id = id.into();
        validate_workflow_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkflowId {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkflowId> for String {
    fn from(id: WorkflowId) -> Self {
        id.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for WorkflowId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a workflow ID string
pub fn validate_workflow_id(id: &str) -> Result<(), WorkflowError> {
    if id.is_empty() {
        return Err(WorkflowError::validation("Workflow ID cannot be empty"));
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(WorkflowError::validation(format!(
            "Workflow ID exceeds maximum length of {} characters",
            MAX_ID_LENGTH
        )));
    }

    if !ID_PATTERN.is_match(id) {
        return Err(WorkflowError::validation(format!(
            "Invalid workflow ID '{}': must be alphanumeric with hyphens or underscores",
            id
        )));
    }

    Ok(())
}

/// Step record as stored: snake_case keys with an untyped config blob
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawWorkflowStep {
    id: String,
    #[serde(default)]
    workflow_id: String,
    step_order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step_name: Option<String>,
    step_type: String,
    #[serde(default)]
    config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_response_template: Option<String>,
}

/// A step within a workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawWorkflowStep", into = "RawWorkflowStep")]
pub struct WorkflowStep {
    id: String,
    workflow_id: String,
    step_order: u32,
    name: Option<String>,
    step_type: WorkflowStepType,
    user_response_template: Option<String>,
}

impl TryFrom<RawWorkflowStep> for WorkflowStep {
    type Error = WorkflowError;

    fn try_from(raw: RawWorkflowStep) -> Result<Self, Self::Error> {
        let config = if raw.config.is_null() {
            Value::Object(Default::default())
        } else {
            raw.config
        };

        let step_type = WorkflowStepType::from_parts(&raw.step_type, config).map_err(|e| {
            WorkflowError::configuration(format!(
                "Invalid config for step {} ({}): {}",
                raw.id, raw.step_type, e
            ))
        })?;

        Ok(Self {
            id: raw.id,
            workflow_id: raw.workflow_id,
            step_order: raw.step_order,
            name: raw.step_name,
            step_type,
            user_response_template: raw.user_response_template,
        })
    }
}

impl From<WorkflowStep> for RawWorkflowStep {
    fn from(step: WorkflowStep) -> Self {
        let type_name = step.step_type.type_name().to_string();
        let config = serde_json::to_value(&step.step_type)
            .ok()
            .and_then(|mut v| v.get_mut("config").map(Value::take))
            .unwrap_or(Value::Null);

        Self {
            id: step.id,
            workflow_id: step.workflow_id,
            step_order: step.step_order,
            step_name: step.name,
            step_type: type_name,
            config,
            user_response_template: step.user_response_template,
        }
    }
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, step_order: u32, step_type: WorkflowStepType) -> Self {
        Self {
            id: id.into(),
            workflow_id: String::new(),
            step_order,
            name: None,
            step_type,
            user_response_template: None,
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = workflow_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_user_response_template(mut self, template: impl Into<String>) -> Self {
        self.user_response_template = Some(template.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn step_order(&self) -> u32 {
        self.step_order
    }

    pub fn step_type(&self) -> &WorkflowStepType {
        &self.step_type
    }

    pub fn user_response_template(&self) -> Option<&str> {
        self.user_response_template.as_deref()
    }

    /// Display name; falls back to `Step <order>: <type>`
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Step {}: {}", self.step_order, self.step_type.type_name()),
        }
    }
}

/// A workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    id: WorkflowId,

    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    /// Extraction type this workflow runs for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extraction_type_id: Option<String>,

    #[serde(default)]
    steps: Vec<WorkflowStep>,

    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Workflow {
    pub fn new(id: WorkflowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            extraction_type_id: None,
            steps: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_extraction_type(mut self, extraction_type_id: impl Into<String>) -> Self {
        self.extraction_type_id = Some(extraction_type_id.into());
        self
    }

    pub fn with_steps(mut self, steps: Vec<WorkflowStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn extraction_type_id(&self) -> Option<&str> {
        self.extraction_type_id.as_deref()
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Steps sorted by `step_order`.
    ///
    /// Fails on an empty workflow or on duplicate step orders, before any step
    /// has run.
    pub fn ordered_steps(&self) -> Result<Vec<&WorkflowStep>, WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::empty_workflow(self.id.as_str()));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.step_order) {
                return Err(WorkflowError::validation(format!(
                    "Duplicate step order {} in workflow '{}'",
                    step.step_order, self.id
                )));
            }
        }

        let mut ordered: Vec<&WorkflowStep> = self.steps.iter().collect();
        ordered.sort_by_key(|step| step.step_order);
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::step_types::{JsonTransformStep, RenameStep};
    use serde_json::json;

    fn rename_step(id: &str, order: u32) -> WorkflowStep {
        WorkflowStep::new(id, order, WorkflowStepType::Rename(RenameStep::default()))
    }

    #[test]
    fn test_valid_workflow_ids() {
        assert!(WorkflowId::new("remittance-flow").is_ok());
        assert!(WorkflowId::new("7f1c2a9e-4b5d-4c8e-9a10-0d2e3f4a5b6c").is_ok());
        assert!(WorkflowId::new("flow_1").is_ok());
        assert!(WorkflowId::new("a").is_ok());
    }

    #[test]
    fn test_invalid_workflow_ids() {
        assert!(WorkflowId::new("").is_err());
        assert!(WorkflowId::new("-starts-with-hyphen").is_err());
        assert!(WorkflowId::new("has spaces").is_err());
        assert!(WorkflowId::new("a".repeat(MAX_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_step_deserializes_from_record() {
        let step: WorkflowStep = serde_json::from_value(json!({
            "id": "s1",
            "workflow_id": "wf",
            "step_order": 2,
            "step_type": "json_transform",
            "config": {"fields": [{"fieldName": "a"}]},
            "user_response_template": "Done {{a}}"
        }))
        .unwrap();

        assert_eq!(step.id(), "s1");
        assert_eq!(step.step_order(), 2);
        assert_eq!(step.user_response_template(), Some("Done {{a}}"));
        assert_eq!(step.display_name(), "Step 2: json_transform");
        assert!(matches!(step.step_type(), WorkflowStepType::JsonTransform(_)));
    }

    #[test]
    fn test_step_with_null_config() {
        let step: WorkflowStep = serde_json::from_value(json!({
            "id": "s1",
            "step_order": 1,
            "step_type": "json_transform",
            "config": null
        }))
        .unwrap();

        assert_eq!(
            step.step_type(),
            &WorkflowStepType::JsonTransform(JsonTransformStep::default())
        );
    }

    #[test]
    fn test_step_with_bad_config_is_rejected() {
        let result: Result<WorkflowStep, _> = serde_json::from_value(json!({
            "id": "s1",
            "step_order": 1,
            "step_type": "conditional_check",
            "config": {"operator": "greater_than"}
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_step_serializes_back_to_record() {
        let step = rename_step("s9", 4).with_workflow_id("wf");
        let value = serde_json::to_value(&step).unwrap();

        assert_eq!(value["step_type"], "rename");
        assert_eq!(value["step_order"], 4);
        assert!(value["config"].is_object());

        let back: WorkflowStep = serde_json::from_value(value).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_ordered_steps_sorts_by_order() {
        let workflow = Workflow::new(WorkflowId::new("wf").unwrap(), "Flow")
            .with_step(rename_step("c", 30))
            .with_step(rename_step("a", 10))
            .with_step(rename_step("b", 20));

        let ids: Vec<&str> = workflow
            .ordered_steps()
            .unwrap()
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ordered_steps_rejects_duplicates() {
        let workflow = Workflow::new(WorkflowId::new("wf").unwrap(), "Flow")
            .with_step(rename_step("a", 1))
            .with_step(rename_step("b", 1));

        let err = workflow.ordered_steps().unwrap_err();
        assert!(err.to_string().contains("Duplicate step order 1"));
    }

    #[test]
    fn test_ordered_steps_rejects_empty() {
        let workflow = Workflow::new(WorkflowId::new("wf").unwrap(), "Flow");
        assert_eq!(
            workflow.ordered_steps().unwrap_err(),
            WorkflowError::empty_workflow("wf")
        );
    }

    #[test]
    fn test_workflow_deserializes_with_steps() {
        let workflow: Workflow = serde_json::from_value(json!({
            "id": "remit",
            "name": "Remittance",
            "extraction_type_id": "et-1",
            "steps": [
                {"id": "s1", "step_order": 1, "step_type": "rename", "config": {}}
            ]
        }))
        .unwrap();

        assert!(workflow.is_enabled());
        assert_eq!(workflow.extraction_type_id(), Some("et-1"));
        assert_eq!(workflow.steps().len(), 1);
    }
}
