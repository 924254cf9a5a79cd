//! Records read from the configuration store

use serde::{Deserialize, Serialize};

/// Base URL and token of an API the endpoint steps call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub base_url: String,

    #[serde(default, alias = "api_key", skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            id: None,
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Token if one is configured and not blank
    pub fn bearer_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Entry of the user directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_ignores_blank() {
        assert_eq!(ApiSettings::new("https://x").bearer_token(), None);
        assert_eq!(ApiSettings::new("https://x").with_token("  ").bearer_token(), None);
        assert_eq!(
            ApiSettings::new("https://x").with_token("abc").bearer_token(),
            Some("abc")
        );
    }
}
