//! Ad hoc email step

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};

use super::StepScope;
use super::attachment::resolve_attachment;
use crate::domain::email::{EmailMessage, EmailSender, parse_recipients};
use crate::domain::store::ConfigurationRepository;
use crate::domain::workflow::{EmailActionStep, ExecutionContext, WorkflowError};

#[derive(Debug, Clone)]
pub struct EmailActionExecutor {
    sender: Arc<dyn EmailSender>,
    config: Arc<dyn ConfigurationRepository>,
}

impl EmailActionExecutor {
    pub fn new(sender: Arc<dyn EmailSender>, config: Arc<dyn ConfigurationRepository>) -> Self {
        Self { sender, config }
    }

    /// Email of the user to CC, if any. Lookup failures only warn.
    async fn cc_user_email(&self, step: &EmailActionStep, context: &ExecutionContext) -> Option<String> {
        let user_id = match &step.cc_user_id {
            Some(template) => Some(context.substitute(template)),
            None if step.cc_user => context.document().user_id.clone(),
            None => None,
        }?;

        match self.config.get_user_email(&user_id).await {
            Ok(Some(email)) if !email.trim().is_empty() => Some(email),
            Ok(_) => {
                warn!(user_id = %user_id, "User has no email address, CC skipped");
                None
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User email lookup failed, CC skipped");
                None
            }
        }
    }

    pub async fn execute(
        &self,
        step: &EmailActionStep,
        scope: &StepScope,
        context: &ExecutionContext,
    ) -> Result<Value, WorkflowError> {
        let to = parse_recipients(&context.substitute(&step.to));
        if to.is_empty() {
            return Err(WorkflowError::validation("Email step has no recipients"));
        }

        let resolve_list = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| parse_recipients(&context.substitute(v)))
                .unwrap_or_default()
        };

        let mut message = EmailMessage::new(
            to,
            context.substitute(&step.subject),
            context.substitute(&step.body),
        )
        .with_from(step.from.as_deref().map(|f| context.substitute(f)))
        .with_cc(resolve_list(&step.cc))
        .with_bcc(resolve_list(&step.bcc))
        .with_html(step.is_html);

        if let Some(email) = self.cc_user_email(step, context).await {
            message.add_cc(email);
        }

        let attachment = resolve_attachment(&step.attachment, context)?;
        let attachment_name = attachment.as_ref().map(|a| a.filename.clone());
        if let Some(attachment) = attachment {
            message = message.with_attachment(attachment);
        }

        self.sender.send(&message).await?;

        info!(
            step_order = scope.step_order,
            recipients = message.to.len(),
            cc = message.cc.len(),
            attachment = attachment_name.as_deref().unwrap_or("none"),
            "Email sent"
        );

        Ok(json!({
            "to": message.to,
            "cc": message.cc,
            "subject": message.subject,
            "attachment": attachment_name,
        }))
    }
}
