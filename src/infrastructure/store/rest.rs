//! REST store client
//!
//! Talks to a PostgREST-style API: one resource per table, `column=eq.value`
//! filters, `apikey` plus bearer authentication.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::domain::email::EmailProviderConfig;
use crate::domain::notification::{
    NotificationLog, NotificationSettings, NotificationTemplate, NotificationType,
};
use crate::domain::store::{ApiSettings, ConfigurationRepository, ExecutionLogRepository, UserProfile};
use crate::domain::workflow::{HttpMethod, StepLog, Workflow, WorkflowExecutionLog};
use crate::domain::DomainError;
use crate::infrastructure::http::{HttpClientTrait, HttpRequest};

#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    http: Arc<dyn HttpClientTrait>,
}

fn eq(value: &str) -> String {
    format!("eq.{}", utf8_percent_encode(value, NON_ALPHANUMERIC))
}

impl RestStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: Arc<dyn HttpClientTrait>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        }
    }

    fn url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/{}", self.base_url, table)
        } else {
            format!("{}/{}?{}", self.base_url, table, query)
        }
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_header("apikey", self.api_key.clone())
            .with_header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn rows(&self, table: &str, query: &str) -> Result<Vec<Value>, DomainError> {
        let request = self.authorize(HttpRequest::get(self.url(table, query)));
        let response = self.http.send(request).await?;

        if !response.is_success() {
            return Err(DomainError::store(format!(
                "GET {} failed with HTTP {}: {}",
                table, response.status, response.body
            )));
        }

        match response.json()? {
            Value::Array(rows) => Ok(rows),
            other => Err(DomainError::store(format!(
                "GET {} returned a non-array body: {}",
                table, other
            ))),
        }
    }

    async fn first<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Option<T>, DomainError> {
        let Some(row) = self.rows(table, query).await?.into_iter().next() else {
            return Ok(None);
        };

        serde_json::from_value(row)
            .map(Some)
            .map_err(|e| DomainError::store(format!("Invalid {} row: {}", table, e)))
    }

    async fn write<T: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        table: &str,
        query: &str,
        body: &T,
    ) -> Result<(), DomainError> {
        let body = serde_json::to_string(body)
            .map_err(|e| DomainError::internal(format!("Failed to serialize {} row: {}", table, e)))?;

        let request = self
            .authorize(HttpRequest::new(method, self.url(table, query)))
            .with_header("Prefer", "return=minimal")
            .with_json(body);

        let response = self.http.send(request).await?;
        if !response.is_success() {
            return Err(DomainError::store(format!(
                "{} {} failed with HTTP {}: {}",
                method, table, response.status, response.body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigurationRepository for RestStore {
    async fn get_api_settings(&self) -> Result<Option<ApiSettings>, DomainError> {
        self.first("api_settings", "select=*&limit=1").await
    }

    async fn get_secondary_api(&self, id: &str) -> Result<Option<ApiSettings>, DomainError> {
        self.first("secondary_api_configs", &format!("select=*&id={}", eq(id)))
            .await
    }

    async fn get_email_provider_config(&self) -> Result<Option<EmailProviderConfig>, DomainError> {
        self.first("email_provider_config", "select=*&limit=1").await
    }

    async fn get_notification_template(
        &self,
        id: &str,
    ) -> Result<Option<NotificationTemplate>, DomainError> {
        self.first("notification_templates", &format!("select=*&id={}", eq(id)))
            .await
    }

    async fn get_default_template(
        &self,
        notification_type: NotificationType,
    ) -> Result<Option<NotificationTemplate>, DomainError> {
        self.first(
            "notification_templates",
            &format!(
                "select=*&template_type={}&is_global_default=eq.true&limit=1",
                eq(notification_type.as_str())
            ),
        )
        .await
    }

    async fn get_notification_settings(
        &self,
        extraction_type_id: &str,
    ) -> Result<Option<NotificationSettings>, DomainError> {
        self.first(
            "extraction_type_notification_settings",
            &format!("select=*&extraction_type_id={}", eq(extraction_type_id)),
        )
        .await
    }

    async fn get_user_email(&self, user_id: &str) -> Result<Option<String>, DomainError> {
        let profile: Option<UserProfile> = self
            .first("user_profiles", &format!("select=id,email&id={}", eq(user_id)))
            .await?;
        Ok(profile.and_then(|p| p.email))
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, DomainError> {
        let Some(mut row) = self
            .rows("workflows", &format!("select=*&id={}", eq(id)))
            .await?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        let steps = self
            .rows(
                "workflow_steps",
                &format!("select=*&workflow_id={}&order=step_order.asc", eq(id)),
            )
            .await?;

        if let Value::Object(obj) = &mut row {
            obj.insert("steps".to_string(), Value::Array(steps));
        }

        serde_json::from_value(row)
            .map(Some)
            .map_err(|e| DomainError::store(format!("Invalid workflow '{}': {}", id, e)))
    }
}

#[async_trait]
impl ExecutionLogRepository for RestStore {
    async fn create_execution_log(&self, log: &WorkflowExecutionLog) -> Result<(), DomainError> {
        self.write(HttpMethod::POST, "workflow_execution_logs", "", log)
            .await
    }

    async fn update_execution_log(&self, log: &WorkflowExecutionLog) -> Result<(), DomainError> {
        let mut body = serde_json::to_value(log)
            .map_err(|e| DomainError::internal(format!("Failed to serialize execution log: {}", e)))?;

        // Stamps are owned by mark_notification_sent
        if let Value::Object(obj) = &mut body {
            obj.remove("success_notification_sent_at");
            obj.remove("failure_notification_sent_at");
        }

        self.write(
            HttpMethod::PATCH,
            "workflow_execution_logs",
            &format!("id={}", eq(&log.id)),
            &body,
        )
        .await
    }

    async fn save_step_log(&self, log: &StepLog) -> Result<(), DomainError> {
        self.write(HttpMethod::POST, "workflow_step_logs", "", log)
            .await
    }

    async fn save_notification_log(&self, log: &NotificationLog) -> Result<(), DomainError> {
        self.write(HttpMethod::POST, "notification_logs", "", log)
            .await
    }

    async fn mark_notification_sent(
        &self,
        execution_log_id: &str,
        notification_type: NotificationType,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let column = match notification_type {
            NotificationType::Success => "success_notification_sent_at",
            NotificationType::Failure => "failure_notification_sent_at",
        };

        self.write(
            HttpMethod::PATCH,
            "workflow_execution_logs",
            &format!("id={}", eq(execution_log_id)),
            &json!({ column: sent_at }),
        )
        .await
    }
}
