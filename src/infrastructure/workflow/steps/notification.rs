//! Template notification step

use serde_json::{Value, json};

use super::StepScope;
use crate::domain::workflow::{ExecutionContext, NotificationStep, WorkflowError};
use crate::infrastructure::workflow::notifier::{NotificationRequest, Notifier};

#[derive(Debug, Clone)]
pub struct NotificationStepExecutor {
    notifier: Notifier,
}

impl NotificationStepExecutor {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub async fn execute(
        &self,
        step: &NotificationStep,
        scope: &StepScope,
        context: &ExecutionContext,
    ) -> Result<Value, WorkflowError> {
        let config = self.notifier.config();
        let template = match step.template_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) => config
                .get_notification_template(id)
                .await?
                .ok_or_else(|| WorkflowError::not_found(format!("Notification template '{}'", id)))?,
            None => config
                .get_default_template(step.notification_type)
                .await?
                .ok_or_else(|| {
                    WorkflowError::configuration(format!(
                        "No default {} notification template configured",
                        step.notification_type
                    ))
                })?,
        };

        let request = NotificationRequest::new(step.notification_type)
            .with_recipient_override(step.recipient_email.clone())
            .with_custom_fields(step.custom_field_mappings.clone())
            .with_attachment(step.attachment.clone())
            .with_execution_log(scope.execution_log_id.clone())
            .with_workflow_name(scope.workflow_name.clone());

        self.notifier.send_template(&template, &request, context).await?;

        Ok(json!({
            "templateId": template.id,
            "notificationType": step.notification_type,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::notification::{NotificationStatus, NotificationTemplate, NotificationType};
    use crate::domain::workflow::SourceDocument;
    use crate::infrastructure::email::ConfiguredEmailSender;
    use crate::infrastructure::http::mock::MockHttpClient;
    use crate::infrastructure::store::{InMemoryStore, StoreSeed};
    use crate::domain::email::{EmailProviderConfig, MockEmailSender, Office365Config};

    const TOKEN_URL: &str = "https://login.microsoftonline.com/tenant/oauth2/v2.0/token";

    fn store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::with_seed(StoreSeed {
            email_provider: Some(EmailProviderConfig::Office365(Office365Config {
                tenant_id: "tenant".to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                default_sender: "noreply@x.com".to_string(),
            })),
            notification_templates: vec![
                NotificationTemplate::new("t1", NotificationType::Success, "Processed {{pdfFilename}}", "ok")
                    .with_recipient("ops@x.com"),
            ],
            ..Default::default()
        }))
    }

    fn context() -> ExecutionContext {
        ExecutionContext::default().with_document(SourceDocument::new("s.pdf"))
    }

    #[tokio::test]
    async fn test_provider_401_fails_step_and_logs() {
        let store = store();
        let http = Arc::new(MockHttpClient::new().with_response(
            TOKEN_URL,
            401,
            r#"{"error":"invalid_client"}"#,
        ));
        let sender = Arc::new(ConfiguredEmailSender::new(store.clone(), http));
        let executor = NotificationStepExecutor::new(Notifier::new(store.clone(), store.clone(), sender));

        let err = executor
            .execute(&NotificationStep::new("t1"), &StepScope::new(1), &context())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid_client"));
        let logs = store.notification_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, NotificationStatus::Failed);
        assert!(logs[0].error_message.as_deref().unwrap().contains("HTTP 401"));
    }

    #[tokio::test]
    async fn test_unknown_template() {
        let store = store();
        let sender = Arc::new(MockEmailSender::new());
        let executor = NotificationStepExecutor::new(Notifier::new(store.clone(), store.clone(), sender));

        let err = executor
            .execute(&NotificationStep::new("nope"), &StepScope::new(1), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }
}
