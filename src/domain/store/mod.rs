//! Configuration and log store
//!
//! The relational store behind the engine is an external collaborator. These
//! traits describe the reads and writes the engine performs against it.

mod entity;
mod repository;

pub use entity::{ApiSettings, UserProfile};
pub use repository::{ConfigurationRepository, ExecutionLogRepository};

#[cfg(test)]
pub use repository::{MockConfigurationRepository, MockExecutionLogRepository};
