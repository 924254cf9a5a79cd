//! Domain layer - Core business logic and entities

pub mod email;
pub mod error;
pub mod notification;
pub mod store;
pub mod workflow;

pub use email::{EmailMessage, EmailProviderConfig, EmailSender, PdfAttachment};
pub use error::DomainError;
pub use notification::{
    NotificationLog, NotificationSettings, NotificationStatus, NotificationTemplate,
    NotificationType,
};
pub use store::{ApiSettings, ConfigurationRepository, ExecutionLogRepository, UserProfile};
pub use workflow::{
    ExecutionContext, ExecutionStatus, SourceDocument, StepExecutionResult, StepLog, Workflow,
    WorkflowError, WorkflowExecutionLog, WorkflowExecutor, WorkflowId, WorkflowResult,
    WorkflowStep, WorkflowStepType,
};
