//! Office365 sender: client-credentials token, then Graph `sendMail`

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::domain::email::{EmailMessage, EmailSender, Office365Config};
use crate::domain::workflow::template::encode_uri_component;
use crate::domain::DomainError;
use crate::infrastructure::http::{HttpClientTrait, HttpRequest};

const PROVIDER: &str = "office365";
const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Clone)]
pub struct Office365Sender {
    config: Office365Config,
    http: Arc<dyn HttpClientTrait>,
}

impl Office365Sender {
    pub fn new(config: Office365Config, http: Arc<dyn HttpClientTrait>) -> Self {
        Self { config, http }
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", LOGIN_BASE_URL, self.config.tenant_id)
    }

    pub fn send_mail_url(from: &str) -> String {
        format!("{}/users/{}/sendMail", GRAPH_BASE_URL, encode_uri_component(from.trim()))
    }

    async fn access_token(&self) -> Result<String, DomainError> {
        let request = HttpRequest::post(self.token_url()).with_form(vec![
            ("client_id".into(), self.config.client_id.clone()),
            ("client_secret".into(), self.config.client_secret.clone()),
            ("scope".into(), GRAPH_SCOPE.into()),
            ("grant_type".into(), "client_credentials".into()),
        ]);

        let response = self.http.send(request).await?;
        if !response.is_success() {
            return Err(DomainError::provider(
                PROVIDER,
                format!("Token request failed with HTTP {}: {}", response.status, response.body),
            ));
        }

        response
            .json()?
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DomainError::provider(PROVIDER, "Token response has no access_token"))
    }

    fn recipients(addresses: &[String]) -> Value {
        Value::Array(
            addresses
                .iter()
                .map(|address| json!({"emailAddress": {"address": address}}))
                .collect(),
        )
    }

    /// Graph `sendMail` payload
    pub fn payload(message: &EmailMessage) -> Value {
        let attachments: Vec<Value> = message
            .attachments
            .iter()
            .map(|a| {
                json!({
                    "@odata.type": "#microsoft.graph.fileAttachment",
                    "name": a.filename,
                    "contentType": "application/pdf",
                    "contentBytes": a.base64_content,
                })
            })
            .collect();

        let mut mail = json!({
            "subject": message.subject,
            "body": {
                "contentType": if message.is_html { "HTML" } else { "Text" },
                "content": message.body,
            },
            "toRecipients": Self::recipients(&message.to),
        });

        if !message.cc.is_empty() {
            mail["ccRecipients"] = Self::recipients(&message.cc);
        }
        if !message.bcc.is_empty() {
            mail["bccRecipients"] = Self::recipients(&message.bcc);
        }
        if !attachments.is_empty() {
            mail["attachments"] = Value::Array(attachments);
        }

        json!({"message": mail, "saveToSentItems": true})
    }
}

#[async_trait]
impl EmailSender for Office365Sender {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        let from = message
            .from
            .clone()
            .unwrap_or_else(|| self.config.default_sender.clone());
        let token = self.access_token().await?;

        let request = HttpRequest::post(Self::send_mail_url(&from))
            .with_header("Authorization", format!("Bearer {}", token))
            .with_json(Self::payload(message).to_string());

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::PdfAttachment;
    use crate::infrastructure::http::HttpBody;
    use crate::infrastructure::http::mock::MockHttpClient;

    fn config() -> Office365Config {
        Office365Config {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            default_sender: "noreply@x.com".into(),
        }
    }

    const TOKEN_URL: &str = "https://login.microsoftonline.com/tenant/oauth2/v2.0/token";
    const SEND_URL: &str = "https://graph.microsoft.com/v1.0/users/noreply%40x.com/sendMail";

    #[tokio::test]
    async fn test_send_with_attachment() {
        let http = Arc::new(
            MockHttpClient::new()
                .with_json(TOKEN_URL, json!({"access_token": "tok"}))
                .with_response(SEND_URL, 202, ""),
        );
        let sender = Office365Sender::new(config(), http.clone());

        let message = EmailMessage::new(vec!["a@x.com".into()], "Hi", "<b>x</b>")
            .with_attachment(PdfAttachment::new("INV-1.pdf", "JVBER"));
        sender.send(&message).await.unwrap();

        let requests = http.requests();
        assert_eq!(requests.len(), 2);

        let send = &requests[1];
        assert_eq!(send.header("authorization"), Some("Bearer tok"));
        let Some(HttpBody::Json(body)) = &send.body else {
            panic!("expected JSON body");
        };
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["saveToSentItems"], true);
        assert_eq!(body["message"]["body"]["contentType"], "HTML");
        assert_eq!(
            body["message"]["attachments"][0]["@odata.type"],
            "#microsoft.graph.fileAttachment"
        );
        assert_eq!(body["message"]["attachments"][0]["contentBytes"], "JVBER");
    }

    #[tokio::test]
    async fn test_send_failure_carries_provider_text() {
        let http = Arc::new(
            MockHttpClient::new()
                .with_json(TOKEN_URL, json!({"access_token": "tok"}))
                .with_response(SEND_URL, 401, r#"{"error":{"code":"InvalidAuthenticationToken"}}"#),
        );
        let sender = Office365Sender::new(config(), http);

        let err = sender
            .send(&EmailMessage::new(vec!["a@x.com".into()], "Hi", "x"))
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("InvalidAuthenticationToken"));
    }

    #[tokio::test]
    async fn test_token_failure() {
        let http = Arc::new(MockHttpClient::new().with_response(TOKEN_URL, 400, "invalid_client"));
        let sender = Office365Sender::new(config(), http);

        let err = sender
            .send(&EmailMessage::new(vec!["a@x.com".into()], "Hi", "x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn test_send_mail_url_encodes_sender() {
        assert_eq!(
            Office365Sender::send_mail_url("ops/../admin@x.com?x=1"),
            "https://graph.microsoft.com/v1.0/users/ops%2F..%2Fadmin%40x.com%3Fx%3D1/sendMail"
        );
    }

    #[test]
    fn test_payload_plain_text_with_cc() {
        let message = EmailMessage::new(vec!["a@x.com".into()], "Hi", "x")
            .with_html(false)
            .with_cc(vec!["c@x.com".into()]);
        let payload = Office365Sender::payload(&message);

        assert_eq!(payload["message"]["body"]["contentType"], "Text");
        assert_eq!(
            payload["message"]["ccRecipients"][0]["emailAddress"]["address"],
            "c@x.com"
        );
        assert!(payload["message"].get("attachments").is_none());
    }
}
