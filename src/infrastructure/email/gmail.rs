//! Gmail sender: refresh-token grant, then `messages/send` with a raw MIME message

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

use super::mime::build_mime_message;
use crate::domain::email::{EmailMessage, EmailSender, GmailConfig};
use crate::domain::DomainError;
use crate::infrastructure::http::{HttpClientTrait, HttpRequest};

const PROVIDER: &str = "gmail";
pub(crate) const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub(crate) const SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

#[derive(Debug, Clone)]
pub struct GmailSender {
    config: GmailConfig,
    http: Arc<dyn HttpClientTrait>,
}

impl GmailSender {
    pub fn new(config: GmailConfig, http: Arc<dyn HttpClientTrait>) -> Self {
        Self { config, http }
    }

    async fn access_token(&self) -> Result<String, DomainError> {
        let request = HttpRequest::post(TOKEN_URL).with_form(vec![
            ("client_id".into(), self.config.client_id.clone()),
            ("client_secret".into(), self.config.client_secret.clone()),
            ("refresh_token".into(), self.config.refresh_token.clone()),
            ("grant_type".into(), "refresh_token".into()),
        ]);

        let response = self.http.send(request).await?;
        if !response.is_success() {
            return Err(DomainError::provider(
                PROVIDER,
                format!("Token refresh failed with HTTP {}: {}", response.status, response.body),
            ));
        }

        response
            .json()?
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DomainError::provider(PROVIDER, "Token response has no access_token"))
    }
}

#[async_trait]
impl EmailSender for GmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        let from = message
            .from
            .clone()
            .unwrap_or_else(|| self.config.default_sender.clone());
        let token = self.access_token().await?;

        let raw = URL_SAFE_NO_PAD.encode(build_mime_message(message, &from));
        let request = HttpRequest::post(SEND_URL)
            .with_header("Authorization", format!("Bearer {}", token))
            .with_json(json!({ "raw": raw }).to_string());

        let response = self.http.send(request).await?;
        if !response.is_success() {
            return Err(DomainError::provider(
                PROVIDER,
                format!("HTTP {}: {}", response.status, response.body),
            ));
        }

        tracing::info!(
            provider = PROVIDER,
            from = %from,
            recipients = message.to.len(),
            attachments = message.attachments.len(),
            "Email sent"
        );
        Ok(())
    }
}
