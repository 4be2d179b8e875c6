//! Prompt-active flag and terminal handoff with the key monitor

use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

/// How long a prompt waits for the key monitor to give the terminal back
const RELEASE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Shared {
    prompt_active: AtomicBool,
    /// Set while the key monitor has the terminal in raw mode
    terminal_claimed: Mutex<bool>,
    released: Condvar,
}

/// Whether a synchronous text prompt currently owns the terminal.
///
/// Written by the input layer, read by the key monitor thread and the
/// renderer. Cheap to clone.
///
/// The monitor takes the terminal with [`claim_terminal`](Self::claim_terminal)
/// and gives it back with [`release_terminal`](Self::release_terminal).
/// [`enter_prompt`](Self::enter_prompt) does not return until the monitor has
/// released it, so a prompt never reads while raw mode is still on.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    shared: Arc<Shared>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_prompt_active(&self) -> bool {
        self.shared.prompt_active.load(Ordering::Acquire)
    }

    /// Mark a prompt as active until the returned guard is dropped.
    ///
    /// Blocks until the key monitor has released the terminal.
    pub fn enter_prompt(&self) -> PromptGuard {
        let was_active = self.shared.prompt_active.swap(true, Ordering::AcqRel);
        let guard = PromptGuard {
            state: self.clone(),
            restore: was_active,
        };

        let deadline = Instant::now() + RELEASE_TIMEOUT;
        let mut claimed = self.shared.terminal_claimed.lock();
        while *claimed {
            if self.shared.released.wait_until(&mut claimed, deadline).timed_out() {
                warn!("key monitor did not release the terminal in time");
                break;
            }
        }
        guard
    }

    /// Run `attach` and mark the terminal as held by the key monitor.
    ///
    /// Returns `None` without calling `attach` while a prompt is active.
    pub fn claim_terminal(
        &self,
        attach: impl FnOnce() -> io::Result<()>,
    ) -> Option<io::Result<()>> {
        let mut claimed = self.shared.terminal_claimed.lock();
        if self.is_prompt_active() {
            return None;
        }
        let result = attach();
        *claimed = result.is_ok();
        Some(result)
    }

    /// Run `detach` and wake any prompt waiting for the terminal
    pub fn release_terminal(&self, detach: impl FnOnce()) {
        let mut claimed = self.shared.terminal_claimed.lock();
        detach();
        *claimed = false;
        self.shared.released.notify_all();
    }
}

/// Clears the prompt flag on drop, restoring any outer prompt's flag
#[derive(Debug)]
pub struct PromptGuard {
    state: InputState,
    restore: bool,
}

impl Drop for PromptGuard {
    fn drop(&mut self) {
        self.state
            .shared
            .prompt_active
            .store(self.restore, Ordering::Release);
    }
}
