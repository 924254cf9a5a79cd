//! Workflow executor trait and result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::ExecutionContext;
use super::entity::Workflow;
use super::error::WorkflowError;

/// Result of executing a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Whether every step completed successfully
    pub success: bool,

    /// Final context snapshot
    pub output: Value,

    /// Results from each executed step
    pub step_results: Vec<StepExecutionResult>,

    /// Total execution time in milliseconds
    pub execution_time_ms: u64,

    /// Id of the persisted execution log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_log_id: Option<String>,

    /// Error message if the workflow failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    pub fn success(
        output: Value,
        step_results: Vec<StepExecutionResult>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            output,
            step_results,
            execution_time_ms,
            execution_log_id: None,
            error: None,
        }
    }

    pub fn failure(
        error: impl Into<String>,
        output: Value,
        step_results: Vec<StepExecutionResult>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            success: false,
            output,
            step_results,
            execution_time_ms,
            execution_log_id: None,
            error: Some(error.into()),
        }
    }

    pub fn with_execution_log_id(mut self, id: impl Into<String>) -> Self {
        self.execution_log_id = Some(id.into());
        self
    }

    /// The step that failed, if any
    pub fn failed_step(&self) -> Option<&StepExecutionResult> {
        self.step_results.iter().find(|r| !r.success)
    }

    /// The most recent resolved user response
    pub fn last_user_response(&self) -> Option<&str> {
        self.step_results
            .iter()
            .rev()
            .find_map(|r| r.user_response.as_deref())
    }
}

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecutionResult {
    pub step_id: String,

    pub step_order: u32,

    pub step_type: String,

    pub success: bool,

    /// Step output if successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// `user_response_template` resolved against the context after the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_response: Option<String>,

    pub execution_time_ms: u64,
}

impl StepExecutionResult {
    pub fn success(
        step_id: impl Into<String>,
        step_order: u32,
        step_type: impl Into<String>,
        output: Value,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            step_order,
            step_type: step_type.into(),
            success: true,
            output: Some(output),
            error: None,
            user_response: None,
            execution_time_ms,
        }
    }

    pub fn failure(
        step_id: impl Into<String>,
        step_order: u32,
        step_type: impl Into<String>,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            step_order,
            step_type: step_type.into(),
            success: false,
            output: None,
            error: Some(error.into()),
            user_response: None,
            execution_time_ms,
        }
    }

    pub fn with_user_response(mut self, response: Option<String>) -> Self {
        self.user_response = response;
        self
    }
}

/// Trait for workflow execution
#[async_trait]
pub trait WorkflowExecutor: Send + Sync + std::fmt::Debug {
    /// Run every step of `workflow` in order against `context`.
    ///
    /// Step failures come back as `Ok` with `success == false`; `Err` is
    /// reserved for problems found before the first step runs.
    async fn execute(
        &self,
        workflow: &Workflow,
        context: ExecutionContext,
    ) -> Result<WorkflowResult, WorkflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_workflow_result_success() {
        let step_results = vec![
            StepExecutionResult::success("s1", 1, "api_call", json!({"id": 1}), 100),
            StepExecutionResult::success("s2", 2, "rename", json!({"f": "a.pdf"}), 5),
        ];

        let result = WorkflowResult::success(json!({"id": 1}), step_results, 105);

        assert!(result.success);
        assert_eq!(result.step_results.len(), 2);
        assert!(result.error.is_none());
        assert!(result.failed_step().is_none());
    }

    #[test]
    fn test_workflow_result_failure() {
        let step_results = vec![
            StepExecutionResult::success("s1", 1, "rename", json!({}), 1),
            StepExecutionResult::failure("s2", 2, "api_call", "status 500", 50),
        ];

        let result = WorkflowResult::failure("status 500", json!({}), step_results, 51)
            .with_execution_log_id("log-1");

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("status 500"));
        assert_eq!(result.failed_step().unwrap().step_id, "s2");
        assert_eq!(result.execution_log_id.as_deref(), Some("log-1"));
    }

    #[test]
    fn test_last_user_response() {
        let step_results = vec![
            StepExecutionResult::success("s1", 1, "rename", json!({}), 1)
                .with_user_response(Some("Renamed".into())),
            StepExecutionResult::success("s2", 2, "api_call", json!({}), 1),
        ];

        let result = WorkflowResult::success(json!({}), step_results, 2);
        assert_eq!(result.last_user_response(), Some("Renamed"));
    }

    #[test]
    fn test_serialization() {
        let result = WorkflowResult::success(
            json!({"answer": "42"}),
            vec![StepExecutionResult::success("s1", 1, "rename", json!({"ok": true}), 100)],
            100,
        );

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("execution_log_id"));

        let deserialized: WorkflowResult = serde_json::from_str(&json).unwrap();
        assert!(deserialized.success);
    }
}
