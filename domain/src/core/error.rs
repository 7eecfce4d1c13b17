//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// These are raised synchronously while validating caller input, before
/// any retrieval or model call is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("At least one agent must be requested")]
    NoAgents,

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl DomainError {
    /// Check if this error was caused by malformed caller input
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            DomainError::EmptyPrompt | DomainError::NoAgents | DomainError::MissingField(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let error = DomainError::MissingField("sector");
        assert_eq!(error.to_string(), "Missing required field: sector");
    }

    #[test]
    fn test_is_invalid_request() {
        assert!(DomainError::EmptyPrompt.is_invalid_request());
        assert!(DomainError::MissingField("sector").is_invalid_request());
        assert!(!DomainError::UnknownAgent("oracle".to_string()).is_invalid_request());
    }
}
