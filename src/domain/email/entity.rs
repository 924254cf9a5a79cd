//! Email message and provider configuration

use serde::{Deserialize, Serialize};

/// A PDF file attached to an email; only ever held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfAttachment {
    pub filename: String,
    pub base64_content: String,
}

impl PdfAttachment {
    pub fn new(filename: impl Into<String>, base64_content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            base64_content: base64_content.into(),
        }
    }
}

/// Fully resolved email, ready to hand to a provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    /// Sender; the provider's default sender when `None`
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub attachments: Vec<PdfAttachment>,
}

impl EmailMessage {
    pub fn new(to: Vec<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to,
            subject: subject.into(),
            body: body.into(),
            is_html: true,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Option<String>) -> Self {
        self.from = from.filter(|f| !f.trim().is_empty());
        self
    }

    pub fn with_cc(mut self, cc: Vec<String>) -> Self {
        self.cc = cc;
        self
    }

    pub fn with_bcc(mut self, bcc: Vec<String>) -> Self {
        self.bcc = bcc;
        self
    }

    pub fn with_html(mut self, is_html: bool) -> Self {
        self.is_html = is_html;
        self
    }

    pub fn with_attachment(mut self, attachment: PdfAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Add a CC address unless it is already a recipient
    pub fn add_cc(&mut self, address: impl Into<String>) {
        let address = address.into();
        let known = self
            .to
            .iter()
            .chain(self.cc.iter())
            .any(|existing| existing.eq_ignore_ascii_case(&address));
        if !known {
            self.cc.push(address);
        }
    }
}

/// Split a recipient list on commas and semicolons
pub fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Office365 client-credentials settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Office365Config {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(alias = "from_email")]
    pub default_sender: String,
}

/// Gmail refresh-token settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GmailConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(alias = "from_email")]
    pub default_sender: String,
}

/// The system-wide email provider choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum EmailProviderConfig {
    #[serde(alias = "microsoft", alias = "outlook")]
    Office365(Office365Config),
    #[serde(alias = "google")]
    Gmail(GmailConfig),
}

impl EmailProviderConfig {
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Office365(_) => "office365",
            Self::Gmail(_) => "gmail",
        }
    }

    pub fn default_sender(&self) -> &str {
        match self {
            Self::Office365(c) => &c.default_sender,
            Self::Gmail(c) => &c.default_sender,
        }
    }
}
