//! User-facing error messages
//!
//! The interactive path never prints a raw error chain. Every error is reduced
//! to a category, a one-line message, and an optional hint.

use super::types::RipcordError;

/// Error category for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Cancellation,
    Configuration,
    Llm,
    ToolExecution,
    Terminal,
    UserInput,
    Internal,
}

impl ErrorCategory {
    /// Get a user-friendly category name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cancellation => "Cancelled",
            Self::Configuration => "Configuration Error",
            Self::Llm => "Model Error",
            Self::ToolExecution => "Tool Execution Error",
            Self::Terminal => "Terminal",
            Self::UserInput => "Invalid Input",
            Self::Internal => "Internal Error",
        }
    }
}

/// User-friendly error information
#[derive(Debug, Clone, PartialEq)]
pub struct UserFriendlyError {
    pub category: ErrorCategory,
    pub message: String,
    pub hint: Option<String>,
}

impl UserFriendlyError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Single line suitable for the prompt area
    pub fn one_line(&self) -> String {
        match &self.hint {
            Some(hint) => format!("{} ({})", self.message, hint),
            None => self.message.clone(),
        }
    }
}

impl From<&RipcordError> for UserFriendlyError {
    fn from(error: &RipcordError) -> Self {
        match error {
            RipcordError::Cancelled { .. } => {
                UserFriendlyError::new(ErrorCategory::Cancellation, "operation cancelled")
            }
            RipcordError::Config { message, .. } => {
                UserFriendlyError::new(ErrorCategory::Configuration, message.clone())
                    .with_hint("check ~/.config/ripcord/config.toml or RIPCORD_* variables")
            }
            RipcordError::Llm { message } => {
                UserFriendlyError::new(ErrorCategory::Llm, message.clone())
            }
            RipcordError::Tool { tool_name, message } => UserFriendlyError::new(
                ErrorCategory::ToolExecution,
                format!("{tool_name}: {message}"),
            ),
            RipcordError::KeyMonitorUnavailable { .. } => {
                UserFriendlyError::new(ErrorCategory::Terminal, "interrupt key unavailable")
                    .with_hint("press Ctrl+C to cancel instead")
            }
            RipcordError::InvalidInput { message, field } => {
                let message = match field {
                    Some(field) => format!("invalid value for '{field}': {message}"),
                    None => message.clone(),
                };
                UserFriendlyError::new(ErrorCategory::UserInput, message)
            }
            RipcordError::Io { message } | RipcordError::Other { message } => {
                UserFriendlyError::new(ErrorCategory::Internal, message.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_neutral() {
        let friendly = UserFriendlyError::from(&RipcordError::cancelled("ESC pressed"));
        assert_eq!(friendly.category, ErrorCategory::Cancellation);
        assert_eq!(friendly.one_line(), "operation cancelled");
    }

    #[test]
    fn test_key_monitor_message_is_actionable() {
        let friendly =
            UserFriendlyError::from(&RipcordError::key_monitor_unavailable("not a tty"));
        assert_eq!(
            friendly.one_line(),
            "interrupt key unavailable (press Ctrl+C to cancel instead)"
        );
    }

    #[test]
    fn test_field_is_named() {
        let friendly = UserFriendlyError::from(&RipcordError::invalid_field(
            "interrupt_key",
            "unknown key 'hyper'",
        ));
        assert!(friendly.message.contains("interrupt_key"));
    }
}
