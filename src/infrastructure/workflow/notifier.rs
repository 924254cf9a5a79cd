//! Template-driven notifications
//!
//! Shared by the notification step and by the orchestrator's run-level
//! success and failure notifications.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::steps::resolve_attachment;
use crate::domain::email::{EmailMessage, EmailSender, parse_recipients};
use crate::domain::notification::{NotificationLog, NotificationTemplate, NotificationType};
use crate::domain::store::{ConfigurationRepository, ExecutionLogRepository};
use crate::domain::workflow::{AttachmentOptions, ExecutionContext, WorkflowError};

/// What to send, beyond the template itself
#[derive(Debug, Clone, Default)]
pub struct NotificationRequest {
    pub notification_type: NotificationType,
    pub recipient_override: Option<String>,
    /// name -> template resolved against the run context
    pub custom_fields: HashMap<String, String>,
    pub attachment: AttachmentOptions,
    pub execution_log_id: Option<String>,
    pub workflow_name: String,
    pub error_message: Option<String>,
}

impl NotificationRequest {
    pub fn new(notification_type: NotificationType) -> Self {
        Self {
            notification_type,
            ..Default::default()
        }
    }

    pub fn with_recipient_override(mut self, recipient: Option<String>) -> Self {
        self.recipient_override = recipient.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_custom_fields(mut self, fields: HashMap<String, String>) -> Self {
        self.custom_fields = fields;
        self
    }

    pub fn with_attachment(mut self, attachment: AttachmentOptions) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn with_execution_log(mut self, id: Option<String>) -> Self {
        self.execution_log_id = id;
        self
    }

    pub fn with_workflow_name(mut self, name: impl Into<String>) -> Self {
        self.workflow_name = name.into();
        self
    }

    pub fn with_error(mut self, message: Option<String>) -> Self {
        self.error_message = message;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    config: Arc<dyn ConfigurationRepository>,
    logs: Arc<dyn ExecutionLogRepository>,
    sender: Arc<dyn EmailSender>,
}

impl Notifier {
    pub fn new(
        config: Arc<dyn ConfigurationRepository>,
        logs: Arc<dyn ExecutionLogRepository>,
        sender: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            config,
            logs,
            sender,
        }
    }

    pub fn config(&self) -> &Arc<dyn ConfigurationRepository> {
        &self.config
    }

    /// Context used for template substitution: the run context plus the
    /// notification variables and resolved custom fields
    fn substitution_context(
        request: &NotificationRequest,
        context: &ExecutionContext,
    ) -> ExecutionContext {
        let mut merged = context.clone();
        let status = match request.notification_type {
            NotificationType::Success => "success",
            NotificationType::Failure => "failed",
        };

        merged.set("workflowName", Value::String(request.workflow_name.clone()));
        merged.set(
            "executionId",
            Value::String(request.execution_log_id.clone().unwrap_or_default()),
        );
        merged.set("status", Value::String(status.to_string()));
        merged.set(
            "errorMessage",
            Value::String(request.error_message.clone().unwrap_or_default()),
        );
        merged.set(
            "pdfFilename",
            Value::String(context.document().filename.clone()),
        );
        merged.set("timestamp", Value::String(Utc::now().to_rfc3339()));

        for (name, template) in &request.custom_fields {
            merged.set(name.clone(), Value::String(context.substitute(template)));
        }

        merged
    }

    async fn record(&self, log: NotificationLog) {
        if let Err(e) = self.logs.save_notification_log(&log).await {
            warn!(error = %e, notification_id = %log.id, "Failed to save notification log");
        }
    }

    /// Render and send a template. A `NotificationLog` is written whatever
    /// the outcome; on success the execution log is stamped.
    pub async fn send_template(
        &self,
        template: &NotificationTemplate,
        request: &NotificationRequest,
        context: &ExecutionContext,
    ) -> Result<(), WorkflowError> {
        let merged = Self::substitution_context(request, context);

        let recipient_template = request
            .recipient_override
            .as_deref()
            .or(template.recipient_email.as_deref())
            .unwrap_or_default();
        let to = parse_recipients(&merged.substitute(recipient_template));
        let subject = merged.substitute(&template.subject_template);
        let recipient = to.join(", ");

        let failed = |message: String| {
            NotificationLog::failed(request.notification_type, recipient.clone(), subject.clone(), message)
                .with_execution_log(request.execution_log_id.clone())
                .with_template(Some(template.id.clone()))
        };

        if to.is_empty() {
            let err = WorkflowError::validation(format!(
                "Notification template '{}' has no recipient",
                template.id
            ));
            self.record(failed(err.to_string())).await;
            return Err(err);
        }

        let resolve_list = |entries: &[String]| -> Vec<String> {
            entries
                .iter()
                .flat_map(|entry| parse_recipients(&merged.substitute(entry)))
                .collect()
        };

        let mut message = EmailMessage::new(to, subject.clone(), merged.substitute(&template.body_template))
            .with_cc(resolve_list(&template.cc_emails))
            .with_bcc(resolve_list(&template.bcc_emails))
            .with_html(template.is_html);

        let mut options = request.attachment.clone();
        options.attach_pdf |= template.attach_pdf;
        match resolve_attachment(&options, &merged) {
            Ok(Some(attachment)) => message = message.with_attachment(attachment),
            Ok(None) => {}
            Err(e) => {
                self.record(failed(e.to_string())).await;
                return Err(e);
            }
        }

        if let Err(e) = self.sender.send(&message).await {
            let err = WorkflowError::from(e);
            warn!(
                template_id = %template.id,
                notification_type = %request.notification_type,
                error = %err,
                "Notification delivery failed"
            );
            self.record(failed(err.to_string())).await;
            return Err(err);
        }

        info!(
            template_id = %template.id,
            notification_type = %request.notification_type,
            recipient = %recipient,
            "Notification sent"
        );

        self.record(
            NotificationLog::sent(request.notification_type, recipient.clone(), subject.clone())
                .with_execution_log(request.execution_log_id.clone())
                .with_template(Some(template.id.clone())),
        )
        .await;

        if let Some(execution_log_id) = &request.execution_log_id {
            if let Err(e) = self
                .logs
                .mark_notification_sent(execution_log_id, request.notification_type, Utc::now())
                .await
            {
                warn!(error = %e, execution_log_id = %execution_log_id, "Failed to stamp notification time");
            }
        }

        Ok(())
    }

    /// Run-level notification driven by the extraction type's settings.
    ///
    /// Skipped silently when the document has no extraction type or the
    /// settings disable this notification type.
    pub async fn notify_completion(
        &self,
        request: NotificationRequest,
        context: &ExecutionContext,
    ) -> Result<bool, WorkflowError> {
        let Some(extraction_type_id) = context.document().extraction_type_id.as_deref() else {
            return Ok(false);
        };

        let Some(settings) = self.config.get_notification_settings(extraction_type_id).await? else {
            return Ok(false);
        };

        if !settings.is_enabled(request.notification_type) {
            return Ok(false);
        }

        let template = match settings.template_id(request.notification_type) {
            Some(id) => self.config.get_notification_template(id).await?,
            None => self.config.get_default_template(request.notification_type).await?,
        };

        let Some(template) = template else {
            warn!(
                extraction_type_id = %extraction_type_id,
                notification_type = %request.notification_type,
                "No notification template available"
            );
            return Ok(false);
        };

        let request = request.with_recipient_override(settings.recipient_override.clone());
        self.send_template(&template, &request, context).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::domain::email::MockEmailSender;
    use crate::domain::notification::{NotificationSettings, NotificationStatus};
    use crate::domain::workflow::{SourceDocument, WorkflowExecutionLog};
    use crate::infrastructure::store::{InMemoryStore, StoreSeed};
    use serde_json::json;

    fn template() -> NotificationTemplate {
        NotificationTemplate::new(
            "t-ok",
            NotificationType::Success,
            "{{workflowName}} done for {{vendor}}",
            "<p>{{pdfFilename}} {{ref}}</p>",
        )
        .with_recipient("ops@x.com")
    }

    fn context() -> ExecutionContext {
        ExecutionContext::from_value(json!({"vendor": "ACME", "invoice": "77"}))
            .with_document(SourceDocument::new("s.pdf").with_extraction_type("et-1"))
    }

    #[tokio::test]
    async fn test_send_template_merges_variables_and_stamps_log() {
        let store = Arc::new(InMemoryStore::new());
        let execution = WorkflowExecutionLog::start("wf", json!({}));
        store.create_execution_log(&execution).await.unwrap();

        let mut sender = MockEmailSender::new();
        sender
            .expect_send()
            .withf(|m: &EmailMessage| {
                m.subject == "Flow done for ACME" && m.body == "<p>s.pdf INV-77</p>"
            })
            .times(1)
            .returning(|_| Ok(()));

        let notifier = Notifier::new(store.clone(), store.clone(), Arc::new(sender));
        let request = NotificationRequest::new(NotificationType::Success)
            .with_workflow_name("Flow")
            .with_execution_log(Some(execution.id.clone()))
            .with_custom_fields(HashMap::from([("ref".to_string(), "INV-{{invoice}}".to_string())]));

        notifier.send_template(&template(), &request, &context()).await.unwrap();

        let logs = store.notification_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, NotificationStatus::Sent);
        assert_eq!(logs[0].recipient, "ops@x.com");
        let stored = store.execution_log(&execution.id).await.unwrap();
        assert!(stored.success_notification_sent_at.is_some());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_logged() {
        let store = Arc::new(InMemoryStore::new());
        let mut sender = MockEmailSender::new();
        sender
            .expect_send()
            .returning(|_| Err(DomainError::provider("office365", "HTTP 401: Unauthorized")));

        let notifier = Notifier::new(store.clone(), store.clone(), Arc::new(sender));
        let err = notifier
            .send_template(&template(), &NotificationRequest::new(NotificationType::Success), &context())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("HTTP 401: Unauthorized"));
        let logs = store.notification_logs().await;
        assert_eq!(logs[0].status, NotificationStatus::Failed);
        assert!(logs[0].error_message.as_deref().unwrap().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_recipient_override() {
        let store = Arc::new(InMemoryStore::new());
        let mut sender = MockEmailSender::new();
        sender
            .expect_send()
            .withf(|m: &EmailMessage| m.to == vec!["boss@x.com".to_string()])
            .times(1)
            .returning(|_| Ok(()));

        let notifier = Notifier::new(store.clone(), store.clone(), Arc::new(sender));
        let request = NotificationRequest::new(NotificationType::Success)
            .with_recipient_override(Some("boss@x.com".to_string()));

        notifier.send_template(&template(), &request, &context()).await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_completion_respects_settings() {
        let store = Arc::new(InMemoryStore::with_seed(StoreSeed {
            notification_templates: vec![
                NotificationTemplate::new("t-fail", NotificationType::Failure, "Failed: {{errorMessage}}", "")
                    .with_recipient("ops@x.com")
                    .as_global_default(),
            ],
            notification_settings: vec![NotificationSettings {
                extraction_type_id: "et-1".to_string(),
                notify_on_failure: true,
                ..Default::default()
            }],
            ..Default::default()
        }));

        let mut sender = MockEmailSender::new();
        sender
            .expect_send()
            .withf(|m: &EmailMessage| m.subject == "Failed: boom")
            .times(1)
            .returning(|_| Ok(()));
        let notifier = Notifier::new(store.clone(), store.clone(), Arc::new(sender));

        let sent = notifier
            .notify_completion(NotificationRequest::new(NotificationType::Success), &context())
            .await
            .unwrap();
        assert!(!sent);

        let sent = notifier
            .notify_completion(
                NotificationRequest::new(NotificationType::Failure).with_error(Some("boom".to_string())),
                &context(),
            )
            .await
            .unwrap();
        assert!(sent);
    }
}
