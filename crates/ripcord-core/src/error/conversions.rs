//! From trait implementations for RipcordError conversions

use super::types::RipcordError;

impl From<anyhow::Error> for RipcordError {
    fn from(error: anyhow::Error) -> Self {
        Self::other(format!("{error:#}"))
    }
}

impl From<std::io::Error> for RipcordError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for RipcordError {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {error}"))
    }
}

impl From<tokio::task::JoinError> for RipcordError {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_cancelled() {
            Self::cancelled("task aborted")
        } else {
            Self::other(format!("task panicked: {error}"))
        }
    }
}
