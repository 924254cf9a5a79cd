//! Step executors, one module per step type

mod api_call;
mod api_endpoint;
mod attachment;
mod conditional;
mod email_action;
mod json_transform;
mod notification;
mod rename;
mod response;

pub use api_call::ApiCallExecutor;
pub use api_endpoint::ApiEndpointExecutor;
pub use attachment::{attachment_filename, resolve_attachment};
pub use conditional::execute_conditional;
pub use email_action::EmailActionExecutor;
pub use json_transform::execute_json_transform;
pub use notification::NotificationStepExecutor;
pub use rename::{execute_rename, execute_rename_at};
pub use response::apply_response;

/// Run-level facts a step may need besides the context
#[derive(Debug, Clone, Default)]
pub struct StepScope {
    pub execution_log_id: Option<String>,
    pub workflow_name: String,
    pub step_order: u32,
}

impl StepScope {
    pub fn new(step_order: u32) -> Self {
        Self {
            step_order,
            ..Default::default()
        }
    }

    pub fn with_execution_log(mut self, id: impl Into<String>) -> Self {
        self.execution_log_id = Some(id.into());
        self
    }

    pub fn with_workflow_name(mut self, name: impl Into<String>) -> Self {
        self.workflow_name = name.into();
        self
    }
}
