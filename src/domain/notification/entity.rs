//! Notification templates, settings and logs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[default]
    Success,
    Failure,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Stored email template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationTemplate {
    pub id: String,

    pub template_type: NotificationType,

    /// Recipient; may contain placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,

    pub subject_template: String,

    #[serde(default)]
    pub body_template: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc_emails: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc_emails: Vec<String>,

    #[serde(default)]
    pub attach_pdf: bool,

    #[serde(default = "default_true")]
    pub is_html: bool,

    /// Used when no template is configured for the extraction type
    #[serde(default)]
    pub is_global_default: bool,
}

impl NotificationTemplate {
    pub fn new(
        id: impl Into<String>,
        template_type: NotificationType,
        subject_template: impl Into<String>,
        body_template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            template_type,
            recipient_email: None,
            subject_template: subject_template.into(),
            body_template: body_template.into(),
            cc_emails: Vec::new(),
            bcc_emails: Vec::new(),
            attach_pdf: false,
            is_html: true,
            is_global_default: false,
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient_email = Some(recipient.into());
        self
    }

    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc_emails.push(cc.into());
        self
    }

    pub fn with_attach_pdf(mut self, attach: bool) -> Self {
        self.attach_pdf = attach;
        self
    }

    pub fn as_global_default(mut self) -> Self {
        self.is_global_default = true;
        self
    }
}

/// Notification settings of an extraction type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    #[serde(default)]
    pub extraction_type_id: String,

    #[serde(default)]
    pub notify_on_success: bool,

    #[serde(default)]
    pub notify_on_failure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_template_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_template_id: Option<String>,

    /// Replaces the template recipient for this extraction type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_override: Option<String>,
}

impl NotificationSettings {
    pub fn is_enabled(&self, notification_type: NotificationType) -> bool {
        match notification_type {
            NotificationType::Success => self.notify_on_success,
            NotificationType::Failure => self.notify_on_failure,
        }
    }

    pub fn template_id(&self, notification_type: NotificationType) -> Option<&str> {
        match notification_type {
            NotificationType::Success => self.success_template_id.as_deref(),
            NotificationType::Failure => self.failure_template_id.as_deref(),
        }
    }
}

/// Delivery status of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

/// Record of one notification attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationLog {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_log_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    pub notification_type: NotificationType,

    pub recipient: String,

    pub subject: String,

    pub status: NotificationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub sent_at: DateTime<Utc>,
}

impl NotificationLog {
    pub fn sent(
        notification_type: NotificationType,
        recipient: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            execution_log_id: None,
            template_id: None,
            notification_type,
            recipient: recipient.into(),
            subject: subject.into(),
            status: NotificationStatus::Sent,
            error_message: None,
            sent_at: Utc::now(),
        }
    }

    pub fn failed(
        notification_type: NotificationType,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: NotificationStatus::Failed,
            error_message: Some(error.into()),
            ..Self::sent(notification_type, recipient, subject)
        }
    }

    pub fn with_execution_log(mut self, execution_log_id: Option<String>) -> Self {
        self.execution_log_id = execution_log_id;
        self
    }

    pub fn with_template(mut self, template_id: Option<String>) -> Self {
        self.template_id = template_id;
        self
    }
}
