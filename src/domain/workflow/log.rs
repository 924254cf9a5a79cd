//! Execution log records written while a workflow runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Status of a step log or an execution log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of one step execution; written on failure as well
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepLog {
    pub id: String,
    pub execution_log_id: String,
    pub step_id: String,
    pub step_order: u32,
    pub step_type: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Context before the step ran
    pub input_snapshot: Value,
    /// Context after the step ran, or `null` on failure
    pub output_snapshot: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_user_response: Option<String>,
}

impl StepLog {
    /// Start a step log in the running state
    pub fn start(
        execution_log_id: impl Into<String>,
        step_id: impl Into<String>,
        step_order: u32,
        step_type: impl Into<String>,
        input_snapshot: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            execution_log_id: execution_log_id.into(),
            step_id: step_id.into(),
            step_order,
            step_type: step_type.into(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            error_message: None,
            input_snapshot,
            output_snapshot: Value::Null,
            resolved_user_response: None,
        }
    }

    pub fn complete(mut self, output_snapshot: Value, user_response: Option<String>) -> Self {
        self.finish(ExecutionStatus::Completed);
        self.output_snapshot = output_snapshot;
        self.resolved_user_response = user_response;
        self
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.finish(ExecutionStatus::Failed);
        self.error_message = Some(error.into());
        self
    }

    fn finish(&mut self, status: ExecutionStatus) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
    }
}

/// Record of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecutionLog {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub context_snapshot: Value,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_notification_sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_notification_sent_at: Option<DateTime<Utc>>,
}

impl WorkflowExecutionLog {
    pub fn start(workflow_id: impl Into<String>, context_snapshot: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            current_step_id: None,
            current_step_name: None,
            error_message: None,
            context_snapshot,
            started_at: Utc::now(),
            completed_at: None,
            success_notification_sent_at: None,
            failure_notification_sent_at: None,
        }
    }

    pub fn set_current_step(&mut self, step_id: impl Into<String>, step_name: impl Into<String>) {
        self.current_step_id = Some(step_id.into());
        self.current_step_name = Some(step_name.into());
    }

    pub fn complete(&mut self, context_snapshot: Value) {
        self.status = ExecutionStatus::Completed;
        self.context_snapshot = context_snapshot;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>, context_snapshot: Value) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(error.into());
        self.context_snapshot = context_snapshot;
        self.completed_at = Some(Utc::now());
    }
}
