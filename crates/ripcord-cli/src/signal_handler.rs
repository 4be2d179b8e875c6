//! Ctrl+C (SIGINT) handling
//!
//! While the key monitor holds the terminal in raw mode Ctrl+C arrives as a
//! key press instead. This handler covers the remaining cases: the monitor is
//! unavailable, or input is piped.

use futures::stream::StreamExt;
use parking_lot::Mutex;
use ripcord_core::interrupt::{ExecutionSession, SIGINT_REASON};
use signal_hook::consts::SIGINT;
use signal_hook_tokio::Signals;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// What the application is doing when the signal lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for user input at prompt
    WaitingForInput,
    /// A query is running
    ExecutingTask,
}

/// Routes SIGINT to the current query's token or exits at the prompt
pub struct SignalHandler {
    task_handle: Option<JoinHandle<()>>,
    app_state: Arc<Mutex<AppState>>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            task_handle: None,
            app_state: Arc::new(Mutex::new(AppState::WaitingForInput)),
        }
    }

    pub fn start(&mut self, session: Arc<ExecutionSession>) -> std::io::Result<()> {
        if self.task_handle.is_some() {
            return Ok(());
        }

        let mut signals = Signals::new([SIGINT])?;
        let app_state = self.app_state.clone();

        self.task_handle = Some(tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                if signal != SIGINT {
                    continue;
                }
                let state = *app_state.lock();
                match state {
                    AppState::WaitingForInput => {
                        eprint!("\r\nGoodbye!\r\n");
                        std::process::exit(0);
                    }
                    AppState::ExecutingTask => {
                        let tripped = session.cancel_all(SIGINT_REASON);
                        debug!(tripped, "SIGINT during query");
                    }
                }
            }
        }));
        Ok(())
    }

    pub fn set_app_state(&self, state: AppState) {
        *self.app_state.lock() = state;
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}
