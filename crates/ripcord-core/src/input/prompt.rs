//! Blocking user prompt interface

use crate::error::RipcordResult;

/// A synchronous terminal prompt.
///
/// Implementations block the calling thread; async callers run them through
/// `tokio::task::spawn_blocking`. An interrupted prompt returns
/// `RipcordError::Cancelled`.
pub trait UserPrompt: Send + Sync {
    /// Read one line of text
    fn prompt_user(&self, message: &str) -> RipcordResult<String>;

    /// Ask a yes/no question
    fn confirm(&self, message: &str) -> RipcordResult<bool> {
        let answer = self.prompt_user(&format!("{message} [y/N]"))?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}
