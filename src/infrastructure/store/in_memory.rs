//! In-memory store, seeded from JSON
//!
//! Used by the CLI for offline runs and by tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::email::EmailProviderConfig;
use crate::domain::notification::{
    NotificationLog, NotificationSettings, NotificationTemplate, NotificationType,
};
use crate::domain::store::{ApiSettings, ConfigurationRepository, ExecutionLogRepository, UserProfile};
use crate::domain::workflow::{StepLog, Workflow, WorkflowExecutionLog};
use crate::domain::DomainError;

/// Seed data for an [`InMemoryStore`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSeed {
    pub api_settings: Option<ApiSettings>,
    pub secondary_apis: HashMap<String, ApiSettings>,
    pub email_provider: Option<EmailProviderConfig>,
    pub notification_templates: Vec<NotificationTemplate>,
    pub notification_settings: Vec<NotificationSettings>,
    pub users: Vec<UserProfile>,
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Default)]
struct LogTables {
    executions: HashMap<String, WorkflowExecutionLog>,
    steps: Vec<StepLog>,
    notifications: Vec<NotificationLog>,
}

/// In-memory implementation of both store traits
#[derive(Debug, Default)]
pub struct InMemoryStore {
    seed: Arc<RwLock<StoreSeed>>,
    logs: Arc<RwLock<LogTables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: StoreSeed) -> Self {
        Self {
            seed: Arc::new(RwLock::new(seed)),
            logs: Arc::default(),
        }
    }

    /// Parse seed data from JSON text
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let seed: StoreSeed = serde_json::from_str(json)
            .map_err(|e| DomainError::configuration(format!("Invalid store seed: {}", e)))?;
        Ok(Self::with_seed(seed))
    }

    pub async fn execution_logs(&self) -> Vec<WorkflowExecutionLog> {
        self.logs.read().await.executions.values().cloned().collect()
    }

    pub async fn execution_log(&self, id: &str) -> Option<WorkflowExecutionLog> {
        self.logs.read().await.executions.get(id).cloned()
    }

    pub async fn step_logs(&self) -> Vec<StepLog> {
        self.logs.read().await.steps.clone()
    }

    pub async fn notification_logs(&self) -> Vec<NotificationLog> {
        self.logs.read().await.notifications.clone()
    }
}

#[async_trait]
impl ConfigurationRepository for InMemoryStore {
    async fn get_api_settings(&self) -> Result<Option<ApiSettings>, DomainError> {
        Ok(self.seed.read().await.api_settings.clone())
    }

    async fn get_secondary_api(&self, id: &str) -> Result<Option<ApiSettings>, DomainError> {
        Ok(self.seed.read().await.secondary_apis.get(id).cloned())
    }

    async fn get_email_provider_config(&self) -> Result<Option<EmailProviderConfig>, DomainError> {
        Ok(self.seed.read().await.email_provider.clone())
    }

    async fn get_notification_template(
        &self,
        id: &str,
    ) -> Result<Option<NotificationTemplate>, DomainError> {
        let seed = self.seed.read().await;
        Ok(seed
            .notification_templates
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn get_default_template(
        &self,
        notification_type: NotificationType,
    ) -> Result<Option<NotificationTemplate>, DomainError> {
        let seed = self.seed.read().await;
        Ok(seed
            .notification_templates
            .iter()
            .find(|t| t.is_global_default && t.template_type == notification_type)
            .cloned())
    }

    async fn get_notification_settings(
        &self,
        extraction_type_id: &str,
    ) -> Result<Option<NotificationSettings>, DomainError> {
        let seed = self.seed.read().await;
        Ok(seed
            .notification_settings
            .iter()
            .find(|s| s.extraction_type_id == extraction_type_id)
            .cloned())
    }

    async fn get_user_email(&self, user_id: &str) -> Result<Option<String>, DomainError> {
        let seed = self.seed.read().await;
        Ok(seed
            .users
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| u.email.clone()))
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, DomainError> {
        let seed = self.seed.read().await;
        Ok(seed
            .workflows
            .iter()
            .find(|w| w.id().as_str() == id)
            .cloned())
    }
}

#[async_trait]
impl ExecutionLogRepository for InMemoryStore {
    async fn create_execution_log(&self, log: &WorkflowExecutionLog) -> Result<(), DomainError> {
        let mut logs = self.logs.write().await;
        logs.executions.insert(log.id.clone(), log.clone());
        Ok(())
    }

    async fn update_execution_log(&self, log: &WorkflowExecutionLog) -> Result<(), DomainError> {
        let mut logs = self.logs.write().await;
        let Some(existing) = logs.executions.get_mut(&log.id) else {
            return Err(DomainError::not_found(format!(
                "Execution log '{}' not found",
                log.id
            )));
        };

        // Notification stamps are written separately and must survive updates
        let success_sent = existing.success_notification_sent_at.or(log.success_notification_sent_at);
        let failure_sent = existing.failure_notification_sent_at.or(log.failure_notification_sent_at);
        *existing = log.clone();
        existing.success_notification_sent_at = success_sent;
        existing.failure_notification_sent_at = failure_sent;
        Ok(())
    }

    async fn save_step_log(&self, log: &StepLog) -> Result<(), DomainError> {
        self.logs.write().await.steps.push(log.clone());
        Ok(())
    }

    async fn save_notification_log(&self, log: &NotificationLog) -> Result<(), DomainError> {
        self.logs.write().await.notifications.push(log.clone());
        Ok(())
    }

    async fn mark_notification_sent(
        &self,
        execution_log_id: &str,
        notification_type: NotificationType,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut logs = self.logs.write().await;
        let Some(log) = logs.executions.get_mut(execution_log_id) else {
            return Err(DomainError::not_found(format!(
                "Execution log '{}' not found",
                execution_log_id
            )));
        };

        match notification_type {
            NotificationType::Success => log.success_notification_sent_at = Some(sent_at),
            NotificationType::Failure => log.failure_notification_sent_at = Some(sent_at),
        }
        Ok(())
    }
}
