//! Terminal key source backed by crossterm

use crossterm::event::{self, DisableFocusChange, EnableFocusChange, Event};
use crossterm::{execute, terminal};
use std::io::{self, IsTerminal};
use std::time::Duration;

use super::{KeySignal, KeySource};

/// Reads keys from the controlling terminal in raw mode.
///
/// Focus reporting is requested when attaching; terminals that ignore the
/// request simply never send focus events.
#[derive(Debug, Default)]
pub struct CrosstermKeySource {
    raw_mode: bool,
    focus_reporting: bool,
}

impl CrosstermKeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for CrosstermKeySource {
    fn attach(&mut self) -> io::Result<()> {
        if !io::stdin().is_terminal() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdin is not a terminal",
            ));
        }
        terminal::enable_raw_mode()?;
        self.raw_mode = true;
        self.focus_reporting = execute!(io::stdout(), EnableFocusChange).is_ok();
        Ok(())
    }

    fn detach(&mut self) {
        if self.focus_reporting {
            let _ = execute!(io::stdout(), DisableFocusChange);
            self.focus_reporting = false;
        }
        if self.raw_mode {
            let _ = terminal::disable_raw_mode();
            self.raw_mode = false;
        }
    }

    fn poll(&mut self, timeout: Duration) -> io::Result<Option<KeySignal>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) => Some(KeySignal::Key(key)),
            Event::FocusGained => Some(KeySignal::FocusGained),
            Event::FocusLost => Some(KeySignal::FocusLost),
            _ => None,
        })
    }
}

impl Drop for CrosstermKeySource {
    fn drop(&mut self) {
        self.detach();
    }
}
