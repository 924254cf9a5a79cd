use thiserror::Error;

/// Core domain errors raised by infrastructure collaborators
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("HTTP error: {message}")]
    Http { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Document error: {message}")]
    Document { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Notification template 'tpl-1' not found");
        assert_eq!(
            error.to_string(),
            "Not found: Notification template 'tpl-1' not found"
        );
    }

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("gmail", "HTTP 401: invalid_grant");
        assert_eq!(
            error.to_string(),
            "Provider error: gmail - HTTP 401: invalid_grant"
        );
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Page number 5 is out of range");
        assert_eq!(
            error.to_string(),
            "Validation error: Page number 5 is out of range"
        );
    }
}
