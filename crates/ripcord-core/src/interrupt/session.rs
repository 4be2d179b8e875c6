//! Execution session: owner of the current query's token

use parking_lot::Mutex;
use tracing::{debug, info};

use super::token::CancellationToken;

/// Holds exactly one current [`CancellationToken`].
///
/// Both operations take the same lock, so `cancel_all` trips the token that
/// was current when it was called and can never reach a token minted by a
/// concurrent `start_new_execution`.
#[derive(Debug, Default)]
pub struct ExecutionSession {
    current: Mutex<CancellationToken>,
}

impl ExecutionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current token with a fresh one and return it.
    ///
    /// Call once per user query before any model or tool work starts.
    pub fn start_new_execution(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock() = token.clone();
        debug!("started new execution");
        token
    }

    /// Cancel whatever token is current. Safe to call from any thread.
    ///
    /// Returns true if this call tripped the token, false if it was already
    /// cancelled.
    pub fn cancel_all(&self, reason: &str) -> bool {
        let current = self.current.lock();
        let tripped = current.cancel(reason);
        if tripped {
            info!(reason, "cancelled current execution");
        }
        tripped
    }

    /// Handle to the current token
    pub fn current_token(&self) -> CancellationToken {
        self.current.lock().clone()
    }
}
