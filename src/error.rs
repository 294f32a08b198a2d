//! Error taxonomy for the automation layer.
//!
//! Each variant maps to one failure class of an invocation:
//! configuration, upstream market data, contract reads, on-chain submission
//! and the alert channel itself. Shape-validation failures are not errors:
//! a game that is not ready to advance is simply left out of the batch.

use thiserror::Error;

/// Result type for automation operations
pub type AutomationResult<T> = Result<T, AutomationError>;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream data error: {0}")]
    Upstream(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Contract read failed: {0}")]
    Contract(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Alert delivery failed: {0}")]
    Alert(String),
}

impl From<reqwest::Error> for AutomationError {
    fn from(err: reqwest::Error) -> Self {
        AutomationError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        AutomationError::Upstream(format!("malformed response: {}", err))
    }
}

impl AutomationError {
    /// Fatal errors abort the invocation before any network traffic.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AutomationError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutomationError::OutOfRange("8 requested, 5 eligible".to_string());
        assert!(err.to_string().contains("Out of range"));
        assert!(err.to_string().contains("5 eligible"));
    }

    #[test]
    fn test_only_config_is_fatal() {
        assert!(AutomationError::Config("CMC_API_KEY not set".into()).is_fatal());
        assert!(!AutomationError::Upstream("timeout".into()).is_fatal());
        assert!(!AutomationError::Submission("reverted".into()).is_fatal());
    }
}
