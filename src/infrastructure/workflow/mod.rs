//! Workflow infrastructure implementations

mod executor_impl;
pub mod notifier;
mod step_logger;
pub mod steps;

pub use executor_impl::WorkflowExecutorImpl;
pub use notifier::{NotificationRequest, Notifier};
pub use step_logger::StepLogger;
