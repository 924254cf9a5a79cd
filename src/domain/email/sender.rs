//! Email sender trait

use async_trait::async_trait;

use super::entity::EmailMessage;
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Delivers an email through a provider.
///
/// A non-2xx provider response is an error carrying the provider's raw text.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EmailSender: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError>;
}
