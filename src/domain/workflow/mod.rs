//! Workflow domain module
//!
//! A workflow is an ordered list of steps run after a document has been
//! extracted. Steps share one [`ExecutionContext`] and address its values with
//! placeholders:
//!
//! - `{{path}}` - dotted path with array access, e.g. `{{lines[0].amount}}`
//! - `{var}` / `${var}` - path variables in endpoint path templates
//!
//! A leading `extractedData.` is ignored, since extracted fields live at the
//! context root.

mod context;
mod document;
mod entity;
mod error;
mod executor;
mod log;
mod step_types;
pub mod template;

pub use context::{
    parse_path, resolve_path, set_path, ExecutionContext, PathToken, EXTRACTED_DATA_KEY,
    EXTRACTED_DATA_PREFIX,
};
pub use document::{OutputFormat, SourceDocument};
pub use entity::{validate_workflow_id, Workflow, WorkflowId, WorkflowStep, MAX_ID_LENGTH};
pub use error::WorkflowError;
pub use executor::{StepExecutionResult, WorkflowExecutor, WorkflowResult};
pub use log::{ExecutionStatus, StepLog, WorkflowExecutionLog};
pub use step_types::{
    ApiCallStep, ApiEndpointStep, ApiSource, AttachmentOptions, AttachmentSource,
    BodyFieldMapping, ConditionOperator, ConditionalCheckStep, EmailActionStep, HttpMethod,
    JsonTransformStep, NotificationStep, OutputTypes, PdfEmailStrategy, QueryParameter,
    RenameStep, ResponseDataMapping, TargetType, TimestampFormat, TransformField, ValueSource,
    WorkflowStepType,
};
