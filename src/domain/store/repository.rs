//! Store repository traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entity::ApiSettings;
use crate::domain::email::EmailProviderConfig;
use crate::domain::error::DomainError;
use crate::domain::notification::{
    NotificationLog, NotificationSettings, NotificationTemplate, NotificationType,
};
use crate::domain::workflow::{StepLog, Workflow, WorkflowExecutionLog};

#[cfg(test)]
use mockall::automock;

/// Read access to workflow and integration configuration.
///
/// Every call goes to the store; nothing is cached between calls.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigurationRepository: Send + Sync + std::fmt::Debug {
    /// Primary API settings
    async fn get_api_settings(&self) -> Result<Option<ApiSettings>, DomainError>;

    /// Secondary API settings by id
    async fn get_secondary_api(&self, id: &str) -> Result<Option<ApiSettings>, DomainError>;

    /// The system-wide email provider configuration
    async fn get_email_provider_config(&self) -> Result<Option<EmailProviderConfig>, DomainError>;

    async fn get_notification_template(
        &self,
        id: &str,
    ) -> Result<Option<NotificationTemplate>, DomainError>;

    /// Global default template for a notification type
    async fn get_default_template(
        &self,
        notification_type: NotificationType,
    ) -> Result<Option<NotificationTemplate>, DomainError>;

    async fn get_notification_settings(
        &self,
        extraction_type_id: &str,
    ) -> Result<Option<NotificationSettings>, DomainError>;

    /// Email address from the user directory
    async fn get_user_email(&self, user_id: &str) -> Result<Option<String>, DomainError>;

    /// Workflow with its steps
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, DomainError>;
}

/// Write access to execution, step and notification logs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExecutionLogRepository: Send + Sync + std::fmt::Debug {
    async fn create_execution_log(&self, log: &WorkflowExecutionLog) -> Result<(), DomainError>;

    async fn update_execution_log(&self, log: &WorkflowExecutionLog) -> Result<(), DomainError>;

    async fn save_step_log(&self, log: &StepLog) -> Result<(), DomainError>;

    async fn save_notification_log(&self, log: &NotificationLog) -> Result<(), DomainError>;

    /// Stamp the success or failure notification time on an execution log
    async fn mark_notification_sent(
        &self,
        execution_log_id: &str,
        notification_type: NotificationType,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}
