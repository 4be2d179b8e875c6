//! Core error types for Ripcord

use thiserror::Error;

/// Result type alias for Ripcord operations
pub type RipcordResult<T> = Result<T, RipcordError>;

/// Main error type for Ripcord
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RipcordError {
    /// The operation was cancelled by the user. Not a failure.
    #[error("operation cancelled: {reason}")]
    Cancelled { reason: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// LLM client errors
    #[error("LLM error: {message}")]
    Llm { message: String },

    /// Tool execution errors
    #[error("Tool error: {tool_name}: {message}")]
    Tool { tool_name: String, message: String },

    /// The global interrupt key hook could not be installed
    #[error("Interrupt key unavailable: {message}")]
    KeyMonitorUnavailable { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io { message: String },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Generic error
    #[error("Error: {message}")]
    Other { message: String },
}

impl RipcordError {
    /// True for the cancellation variant
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The cancellation reason, if this is a cancellation
    pub fn cancel_reason(&self) -> Option<&str> {
        match self {
            Self::Cancelled { reason } => Some(reason),
            _ => None,
        }
    }
}
