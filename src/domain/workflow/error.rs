//! Workflow error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that can occur while running a workflow.
///
/// Every variant is fatal for the run: the orchestrator stops at the step that
/// raised it. Soft problems (unresolved placeholders, missing mapping sources,
/// CC lookup failures) are logged instead of being returned.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("External call failed{}: {message}", status_suffix(.status))]
    ExternalCall {
        status: Option<u16>,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Step execution failed in '{step}': {message}")]
    StepExecution { step: String, message: String },

    #[error("Workflow has no steps: {0}")]
    EmptyWorkflow(String),

    #[error("Store error: {0}")]
    Store(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" with status {}", s))
        .unwrap_or_default()
}

impl WorkflowError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn external_call(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalCall {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn step_execution(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StepExecution {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn empty_workflow(id: impl Into<String>) -> Self {
        Self::EmptyWorkflow(id.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { message } => Self::NotFound(message),
            DomainError::Validation { message } => Self::Validation(message),
            DomainError::Configuration { message } => Self::Configuration(message),
            DomainError::Http { message } => Self::ExternalCall {
                status: None,
                message,
            },
            DomainError::Provider { provider, message } => Self::ExternalCall {
                status: None,
                message: format!("{}: {}", provider, message),
            },
            DomainError::Store { message } => Self::Store(message),
            DomainError::Document { message } => Self::Validation(message),
            DomainError::Internal { message } => Self::StepExecution {
                step: "internal".to_string(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::not_found("invoice-flow");
        assert_eq!(err.to_string(), "Workflow not found: invoice-flow");

        let err = WorkflowError::step_execution("api_call", "Connection failed");
        assert_eq!(
            err.to_string(),
            "Step execution failed in 'api_call': Connection failed"
        );

        let err = WorkflowError::external_call(Some(404), "{\"error\":\"missing\"}");
        assert_eq!(
            err.to_string(),
            "External call failed with status 404: {\"error\":\"missing\"}"
        );

        let err = WorkflowError::external_call(None, "connection refused");
        assert_eq!(err.to_string(), "External call failed: connection refused");
    }

    #[test]
    fn test_from_domain_error() {
        let err: WorkflowError = DomainError::configuration("Base URL is empty").into();
        assert_eq!(err, WorkflowError::configuration("Base URL is empty"));

        let err: WorkflowError = DomainError::provider("office365", "HTTP 401: denied").into();
        assert!(err.to_string().contains("office365: HTTP 401: denied"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            WorkflowError::validation("bad"),
            WorkflowError::validation("bad")
        );
        assert_ne!(
            WorkflowError::validation("bad"),
            WorkflowError::configuration("bad")
        );
    }
}
