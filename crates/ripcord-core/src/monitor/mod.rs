//! Global interrupt key monitor
//!
//! Runs on its own OS thread, outside the async runtime. When the interrupt
//! key is pressed it trips the current query's token through
//! [`ExecutionSession::cancel_all`] and does nothing else: it never touches
//! the event bus or renderer state. The query loop notices the tripped token
//! on its next poll and does the reporting.
//!
//! While a synchronous prompt is active the monitor releases the terminal
//! entirely so the prompt's own line editing gets every key. The handoff goes
//! through [`InputState`]: a prompt waits until the monitor has detached.

mod crossterm_source;

pub use crossterm_source::CrosstermKeySource;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::InterruptKey;
use crate::error::{RipcordError, RipcordResult};
use crate::input::InputState;
use crate::interrupt::{ExecutionSession, USER_INTERRUPT_REASON};

/// Something read from the terminal by a [`KeySource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySignal {
    Key(KeyEvent),
    FocusGained,
    FocusLost,
}

/// Where the monitor reads keys from
pub trait KeySource: Send + 'static {
    /// Take over the terminal for key reading. An error means the platform
    /// refused (no tty, no permission) and the monitor should give up.
    fn attach(&mut self) -> io::Result<()>;

    /// Give the terminal back
    fn detach(&mut self);

    /// Wait up to `timeout` for the next signal
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<KeySignal>>;

    /// Startup check run on the caller's thread
    fn probe(&mut self) -> io::Result<()> {
        self.attach()?;
        self.detach();
        Ok(())
    }
}

/// Lifecycle of the monitor thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMonitorStatus {
    Active,
    Unavailable(String),
    Stopped,
}

/// True when `event` is a press of `key`
pub fn key_matches(key: InterruptKey, event: &KeyEvent) -> bool {
    if event.kind == KeyEventKind::Release {
        return false;
    }
    match key {
        InterruptKey::Esc => event.code == KeyCode::Esc,
        InterruptKey::Ctrl(c) => {
            event.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(event.code, KeyCode::Char(x) if x.eq_ignore_ascii_case(&c))
        }
        InterruptKey::Function(n) => event.code == KeyCode::F(n),
        InterruptKey::Char(c) => {
            !event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char(c)
        }
    }
}

/// Raw mode swallows SIGINT, so Ctrl+C is an interrupt key while attached.
fn is_ctrl_c(event: &KeyEvent) -> bool {
    event.kind != KeyEventKind::Release
        && event.modifiers.contains(KeyModifiers::CONTROL)
        && event.code == KeyCode::Char('c')
}

/// Builder for the monitor thread
pub struct KeyMonitor<S: KeySource> {
    source: S,
    key: InterruptKey,
    session: Arc<ExecutionSession>,
    input: InputState,
    poll_interval: Duration,
}

impl<S: KeySource> KeyMonitor<S> {
    pub fn new(
        source: S,
        key: InterruptKey,
        session: Arc<ExecutionSession>,
        input: InputState,
    ) -> Self {
        Self {
            source,
            key,
            session,
            input,
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Probe the platform and spawn the listener thread.
    ///
    /// If the key hook cannot be installed this logs one actionable warning
    /// and returns `KeyMonitorUnavailable`; the application keeps running
    /// without the feature.
    pub fn start(mut self) -> RipcordResult<KeyMonitorHandle> {
        if let Err(e) = self.source.probe() {
            warn!(
                "interrupt key unavailable: {e}. Run ripcord in an interactive terminal \
                 (and grant it terminal access) to cancel with {}; Ctrl+C still works",
                self.key
            );
            return Err(RipcordError::key_monitor_unavailable(e.to_string()));
        }

        let running = Arc::new(AtomicBool::new(true));
        let status = Arc::new(Mutex::new(KeyMonitorStatus::Active));

        let thread = thread::Builder::new()
            .name("key-monitor".to_string())
            .spawn({
                let running = running.clone();
                let status = status.clone();
                move || self.run(running, status)
            })
            .map_err(|e| RipcordError::key_monitor_unavailable(e.to_string()))?;

        info!("key monitor started");
        Ok(KeyMonitorHandle {
            running,
            status,
            thread: Some(thread),
        })
    }

    fn run(mut self, running: Arc<AtomicBool>, status: Arc<Mutex<KeyMonitorStatus>>) {
        let mut attached = false;
        // Focus detection is best effort: without focus reports we assume focus.
        let mut focused = true;

        while running.load(Ordering::Acquire) {
            if self.input.is_prompt_active() {
                if attached {
                    self.release();
                    attached = false;
                    debug!("prompt active, key monitor released terminal");
                }
                thread::sleep(self.poll_interval);
                continue;
            }

            if !attached {
                let source = &mut self.source;
                match self.input.claim_terminal(|| source.attach()) {
                    None => continue,
                    Some(Err(e)) => {
                        warn!("interrupt key disabled for this session: {e}");
                        *status.lock() = KeyMonitorStatus::Unavailable(e.to_string());
                        return;
                    }
                    Some(Ok(())) => attached = true,
                }
            }

            match self.source.poll(self.poll_interval) {
                Ok(Some(KeySignal::FocusGained)) => focused = true,
                Ok(Some(KeySignal::FocusLost)) => focused = false,
                Ok(Some(KeySignal::Key(event))) => {
                    if !(key_matches(self.key, &event) || is_ctrl_c(&event)) {
                        continue;
                    }
                    // A prompt may have opened while we were blocked in poll.
                    if self.input.is_prompt_active() {
                        continue;
                    }
                    if !focused {
                        debug!("interrupt key ignored, terminal not focused");
                        continue;
                    }
                    self.session.cancel_all(USER_INTERRUPT_REASON);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("interrupt key disabled for this session: {e}");
                    *status.lock() = KeyMonitorStatus::Unavailable(e.to_string());
                    if attached {
                        self.release();
                    }
                    return;
                }
            }
        }

        if attached {
            self.release();
        }
        *status.lock() = KeyMonitorStatus::Stopped;
    }

    fn release(&mut self) {
        let source = &mut self.source;
        self.input.release_terminal(|| source.detach());
    }
}

/// Owner handle for a running monitor; stops the thread on drop
pub struct KeyMonitorHandle {
    running: Arc<AtomicBool>,
    status: Arc<Mutex<KeyMonitorStatus>>,
    thread: Option<JoinHandle<()>>,
}

impl KeyMonitorHandle {
    pub fn status(&self) -> KeyMonitorStatus {
        self.status.lock().clone()
    }

    /// Signal the thread to stop and wait for it to give the terminal back
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("key monitor thread panicked");
            }
        }
    }
}

impl Drop for KeyMonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
