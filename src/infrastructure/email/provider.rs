//! Email sender that picks its provider from the stored configuration

use std::sync::Arc;

use async_trait::async_trait;

use super::gmail::GmailSender;
use super::office365::Office365Sender;
use crate::domain::email::{EmailMessage, EmailProviderConfig, EmailSender};
use crate::domain::store::ConfigurationRepository;
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;

/// Reads the provider configuration on every send and delegates to the
/// matching provider
#[derive(Debug, Clone)]
pub struct ConfiguredEmailSender {
    config: Arc<dyn ConfigurationRepository>,
    http: Arc<dyn HttpClientTrait>,
}

impl ConfiguredEmailSender {
    pub fn new(config: Arc<dyn ConfigurationRepository>, http: Arc<dyn HttpClientTrait>) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl EmailSender for ConfiguredEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        if message.to.is_empty() {
            return Err(DomainError::validation("Email has no recipients"));
        }

        let provider = self
            .config
            .get_email_provider_config()
            .await?
            .ok_or_else(|| DomainError::configuration("Email provider is not configured"))?;

        tracing::debug!(provider = provider.provider_name(), "Dispatching email");

        match provider {
            EmailProviderConfig::Office365(config) => {
                Office365Sender::new(config, self.http.clone()).send(message).await
            }
            EmailProviderConfig::Gmail(config) => {
                GmailSender::new(config, self.http.clone()).send(message).await
            }
        }
    }
}
