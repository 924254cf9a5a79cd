//! Persists execution and step logs for a run
//!
//! Persistence failures never fail a run; they are reported as warnings.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::domain::store::ExecutionLogRepository;
use crate::domain::workflow::{StepLog, WorkflowExecutionLog, WorkflowStep};

#[derive(Debug, Clone)]
pub struct StepLogger {
    logs: Arc<dyn ExecutionLogRepository>,
}

impl StepLogger {
    pub fn new(logs: Arc<dyn ExecutionLogRepository>) -> Self {
        Self { logs }
    }

    /// Create the running execution log for a workflow
    pub async fn begin_run(&self, workflow_id: &str, snapshot: Value) -> WorkflowExecutionLog {
        let log = WorkflowExecutionLog::start(workflow_id, snapshot);
        if let Err(e) = self.logs.create_execution_log(&log).await {
            warn!(error = %e, workflow_id = %workflow_id, "Failed to create execution log");
        }
        log
    }

    pub async fn update_run(&self, log: &WorkflowExecutionLog) {
        if let Err(e) = self.logs.update_execution_log(log).await {
            warn!(
                error = %e,
                execution_log_id = %log.id,
                status = %log.status,
                "Failed to update execution log"
            );
        }
    }

    /// Open a step log with the context as it was before the step
    pub fn begin_step(&self, run: &WorkflowExecutionLog, step: &WorkflowStep, input: Value) -> StepLog {
        StepLog::start(
            run.id.clone(),
            step.id(),
            step.step_order(),
            step.step_type().type_name(),
            input,
        )
    }

    pub async fn record_step(&self, log: &StepLog) {
        if let Err(e) = self.logs.save_step_log(log).await {
            warn!(
                error = %e,
                step_id = %log.step_id,
                step_order = log.step_order,
                "Failed to save step log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::domain::store::MockExecutionLogRepository;
    use crate::domain::workflow::{ExecutionStatus, RenameStep, WorkflowStepType};
    use serde_json::json;

    #[tokio::test]
    async fn test_persistence_failures_are_swallowed() {
        let mut repo = MockExecutionLogRepository::new();
        repo.expect_create_execution_log()
            .times(1)
            .returning(|_| Err(DomainError::store("down")));
        repo.expect_save_step_log()
            .times(1)
            .returning(|_| Err(DomainError::store("down")));

        let logger = StepLogger::new(Arc::new(repo));
        let run = logger.begin_run("wf", json!({"a": 1})).await;
        assert_eq!(run.status, ExecutionStatus::Running);

        let step = WorkflowStep::new("s1", 1, WorkflowStepType::Rename(RenameStep::default()));
        let log = logger.begin_step(&run, &step, json!({})).fail("boom");
        logger.record_step(&log).await;

        assert_eq!(log.execution_log_id, run.id);
        assert_eq!(log.step_type, "rename");
    }
}
