//! Workflow executor implementation

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::notifier::{NotificationRequest, Notifier};
use super::step_logger::StepLogger;
use super::steps::{
    ApiCallExecutor, ApiEndpointExecutor, EmailActionExecutor, NotificationStepExecutor,
    StepScope, execute_conditional, execute_json_transform, execute_rename,
};
use crate::domain::email::EmailSender;
use crate::domain::notification::NotificationType;
use crate::domain::store::{ConfigurationRepository, ExecutionLogRepository};
use crate::domain::workflow::{
    ExecutionContext, StepExecutionResult, Workflow, WorkflowError, WorkflowExecutor,
    WorkflowResult, WorkflowStep, WorkflowStepType,
};
use crate::infrastructure::http::HttpClientTrait;

/// Runs the steps of a workflow in order, logging each one and sending the
/// run-level notifications
#[derive(Debug)]
pub struct WorkflowExecutorImpl {
    api_call: ApiCallExecutor,
    api_endpoint: ApiEndpointExecutor,
    email_action: EmailActionExecutor,
    notification: NotificationStepExecutor,
    notifier: Notifier,
    logger: StepLogger,
}

impl WorkflowExecutorImpl {
    pub fn new(
        config: Arc<dyn ConfigurationRepository>,
        logs: Arc<dyn ExecutionLogRepository>,
        http: Arc<dyn HttpClientTrait>,
        sender: Arc<dyn EmailSender>,
    ) -> Self {
        let notifier = Notifier::new(config.clone(), logs.clone(), sender.clone());
        Self {
            api_call: ApiCallExecutor::new(http.clone()),
            api_endpoint: ApiEndpointExecutor::new(http, config.clone()),
            email_action: EmailActionExecutor::new(sender, config),
            notification: NotificationStepExecutor::new(notifier.clone()),
            notifier,
            logger: StepLogger::new(logs),
        }
    }

    /// Execute a single step
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        scope: &StepScope,
        context: &mut ExecutionContext,
    ) -> Result<Value, WorkflowError> {
        match step.step_type() {
            WorkflowStepType::ApiCall(config) => self.api_call.execute(config, scope, context).await,
            WorkflowStepType::ApiEndpoint(config) => {
                self.api_endpoint.execute(config, scope, context).await
            }
            WorkflowStepType::ConditionalCheck(config) => {
                execute_conditional(config, step.step_order(), context)
            }
            WorkflowStepType::JsonTransform(config) => execute_json_transform(config, context),
            WorkflowStepType::Rename(config) => execute_rename(config, context),
            WorkflowStepType::EmailAction(config) => {
                self.email_action.execute(config, scope, context).await
            }
            WorkflowStepType::Notification(config) => {
                self.notification.execute(config, scope, context).await
            }
        }
    }

    /// Send a run-level notification; its failure never changes the run outcome
    async fn notify(
        &self,
        notification_type: NotificationType,
        workflow: &Workflow,
        execution_log_id: &str,
        error: Option<String>,
        context: &ExecutionContext,
    ) {
        let request = NotificationRequest::new(notification_type)
            .with_workflow_name(workflow.name())
            .with_execution_log(Some(execution_log_id.to_string()))
            .with_error(error);

        match self.notifier.notify_completion(request, context).await {
            Ok(true) => debug!(notification_type = %notification_type, "Run notification sent"),
            Ok(false) => debug!(notification_type = %notification_type, "Run notification not configured"),
            Err(e) => warn!(
                error = %e,
                notification_type = %notification_type,
                execution_log_id = %execution_log_id,
                "Run notification failed"
            ),
        }
    }
}

#[async_trait]
impl WorkflowExecutor for WorkflowExecutorImpl {
    async fn execute(
        &self,
        workflow: &Workflow,
        mut context: ExecutionContext,
    ) -> Result<WorkflowResult, WorkflowError> {
        let start = Instant::now();

        if !workflow.is_enabled() {
            return Err(WorkflowError::invalid_input(format!(
                "Workflow '{}' is disabled",
                workflow.id()
            )));
        }

        let steps = workflow.ordered_steps()?;

        info!(
            workflow_id = %workflow.id(),
            steps = steps.len(),
            "Executing workflow"
        );

        let mut run = self
            .logger
            .begin_run(workflow.id().as_str(), context.snapshot())
            .await;
        let mut step_results = Vec::with_capacity(steps.len());

        for step in steps {
            let step_start = Instant::now();
            let name = step.display_name();
            let scope = StepScope::new(step.step_order())
                .with_execution_log(run.id.clone())
                .with_workflow_name(workflow.name());

            run.set_current_step(step.id(), name.clone());
            self.logger.update_run(&run).await;

            debug!(step_id = %step.id(), step_order = step.step_order(), "Executing step '{}'", name);

            let step_log = self.logger.begin_step(&run, step, context.snapshot());
            let step_type = step.step_type().type_name();

            match self.execute_step(step, &scope, &mut context).await {
                Ok(output) => {
                    let user_response = step
                        .user_response_template()
                        .map(|template| context.substitute(template));

                    self.logger
                        .record_step(&step_log.complete(context.snapshot(), user_response.clone()))
                        .await;

                    step_results.push(
                        StepExecutionResult::success(
                            step.id(),
                            step.step_order(),
                            step_type,
                            output,
                            step_start.elapsed().as_millis() as u64,
                        )
                        .with_user_response(user_response),
                    );
                }
                Err(e) => {
                    warn!(
                        step_id = %step.id(),
                        step_order = step.step_order(),
                        step_type = step_type,
                        error = %e,
                        "Step failed, halting workflow"
                    );

                    self.logger.record_step(&step_log.fail(e.to_string())).await;
                    step_results.push(StepExecutionResult::failure(
                        step.id(),
                        step.step_order(),
                        step_type,
                        e.to_string(),
                        step_start.elapsed().as_millis() as u64,
                    ));

                    let message = format!("Step '{}' failed: {}", name, e);
                    run.fail(message.clone(), context.snapshot());
                    self.logger.update_run(&run).await;

                    self.notify(
                        NotificationType::Failure,
                        workflow,
                        &run.id,
                        Some(message.clone()),
                        &context,
                    )
                    .await;

                    return Ok(WorkflowResult::failure(
                        message,
                        context.snapshot(),
                        step_results,
                        start.elapsed().as_millis() as u64,
                    )
                    .with_execution_log_id(run.id.clone()));
                }
            }
        }

        run.complete(context.snapshot());
        self.logger.update_run(&run).await;

        info!(
            workflow_id = %workflow.id(),
            execution_log_id = %run.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Workflow completed"
        );

        self.notify(NotificationType::Success, workflow, &run.id, None, &context)
            .await;

        Ok(WorkflowResult::success(
            context.snapshot(),
            step_results,
            start.elapsed().as_millis() as u64,
        )
        .with_execution_log_id(run.id))
    }
}
