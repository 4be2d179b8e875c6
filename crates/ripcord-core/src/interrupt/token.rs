//! One-shot cancellation signal

use std::sync::{Arc, OnceLock};

use crate::error::{RipcordError, RipcordResult};

#[derive(Debug, Default)]
struct TokenState {
    signal: tokio_util::sync::CancellationToken,
    reason: OnceLock<String>,
}

/// Thread-safe, one-shot cancellation flag with a reason.
///
/// Clones share state. Once tripped the token stays cancelled and keeps the
/// first reason it was given; later `cancel` calls are no-ops.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Returns true only for the call that actually cancelled it.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        if self.state.reason.set(reason.into()).is_err() {
            return false;
        }
        // Reason is set before the signal so readers that see the signal see the reason.
        self.state.signal.cancel();
        true
    }

    /// Non-blocking check, safe from any thread
    pub fn is_cancelled(&self) -> bool {
        self.state.signal.is_cancelled()
    }

    pub fn reason(&self) -> Option<&str> {
        if self.is_cancelled() {
            self.state.reason.get().map(String::as_str)
        } else {
            None
        }
    }

    /// `Err(Cancelled { reason })` if the token has been tripped
    pub fn raise_if_cancelled(&self) -> RipcordResult<()> {
        if self.is_cancelled() {
            Err(self.to_error())
        } else {
            Ok(())
        }
    }

    /// The cancellation condition for this token
    pub fn to_error(&self) -> RipcordError {
        RipcordError::cancelled(self.reason().unwrap_or("cancelled"))
    }

    /// True when both handles refer to the same underlying token
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}
