//! Screen writers for the reactive side
//!
//! The interface manager never writes to the terminal directly; it drives a
//! [`Renderer`]. All output uses `\r\n` line endings because the key monitor
//! keeps the terminal in raw mode while a query runs.

use colored::*;
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::time::Duration;
use tracing::debug;

/// Terminal status line of the live panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl PanelStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, PanelStatus::Running)
    }
}

/// The only writer to the screen from the reactive side
pub trait Renderer: Send + Sync {
    fn spinner_start(&self, message: &str);

    fn spinner_stop(&self);

    fn panel_open(&self, title: &str);

    /// Replace the panel contents. `body` is the whole buffered output; the
    /// renderer decides how much of it fits.
    fn panel_redraw(&self, title: &str, body: &str, status: PanelStatus);

    /// Stop tracking the panel. With `erase` the panel is removed from the
    /// screen, otherwise its last frame stays in the scrollback.
    fn panel_close(&self, erase: bool);

    /// One line of text above the live visuals
    fn announce(&self, message: &str);
}

/// Lines of tool output shown in the live panel
pub const DEFAULT_PANEL_LINES: usize = 8;

struct PanelFrame {
    drawn_rows: u16,
}

/// Renderer for an interactive terminal: `indicatif` spinner plus a
/// `crossterm` live panel that redraws in place.
pub struct TerminalRenderer {
    spinner: Mutex<Option<ProgressBar>>,
    panel: Mutex<Option<PanelFrame>>,
    max_lines: usize,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::with_max_lines(DEFAULT_PANEL_LINES)
    }

    pub fn with_max_lines(max_lines: usize) -> Self {
        Self {
            spinner: Mutex::new(None),
            panel: Mutex::new(None),
            max_lines: max_lines.max(1),
        }
    }

    fn draw(
        &self,
        frame: &mut PanelFrame,
        title: &str,
        body: &str,
        status: PanelStatus,
    ) -> io::Result<()> {
        let width = terminal::size()
            .map(|(w, _)| w as usize)
            .unwrap_or(80)
            .max(20);
        let mut out = io::stdout().lock();
        erase_rows(&mut out, frame.drawn_rows)?;

        let mut rows = vec![format!("{} {}", "⏺".cyan(), title.bold())];
        for line in tail_lines(body, self.max_lines) {
            rows.push(format!("  {} {}", "│".dimmed(), clip(line, width - 4)));
        }
        rows.push(format!("  {}", status_label(status)));

        for row in &rows {
            queue!(out, Print(row), Print("\r\n"))?;
        }
        out.flush()?;
        frame.drawn_rows = rows.len().min(u16::MAX as usize) as u16;
        Ok(())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn erase_rows(out: &mut impl Write, rows: u16) -> io::Result<()> {
    if rows > 0 {
        queue!(out, MoveToColumn(0), MoveUp(rows), Clear(ClearType::FromCursorDown))?;
    } else {
        queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    }
    Ok(())
}

fn status_label(status: PanelStatus) -> ColoredString {
    match status {
        PanelStatus::Running => "running…".dimmed(),
        PanelStatus::Succeeded => "✓ done".green(),
        PanelStatus::Failed => "✗ failed".red(),
        PanelStatus::Cancelled => "⏹ cancelled".yellow(),
    }
}

/// The last `max` lines of `body`
pub(crate) fn tail_lines(body: &str, max: usize) -> Vec<&str> {
    let mut lines: Vec<&str> = body.lines().rev().take(max).collect();
    lines.reverse();
    lines
}

fn clip(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let mut clipped: String = line.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

impl Renderer for TerminalRenderer {
    fn spinner_start(&self, message: &str) {
        let mut spinner = self.spinner.lock();
        if let Some(old) = spinner.take() {
            old.finish_and_clear();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        *spinner = Some(pb);
    }

    fn spinner_stop(&self) {
        if let Some(pb) = self.spinner.lock().take() {
            pb.finish_and_clear();
        }
    }

    fn panel_open(&self, title: &str) {
        let mut panel = self.panel.lock();
        let mut frame = PanelFrame { drawn_rows: 0 };
        if let Err(e) = self.draw(&mut frame, title, "", PanelStatus::Running) {
            debug!("panel open failed: {e}");
        }
        *panel = Some(frame);
    }

    fn panel_redraw(&self, title: &str, body: &str, status: PanelStatus) {
        let mut panel = self.panel.lock();
        let frame = panel.get_or_insert(PanelFrame { drawn_rows: 0 });
        if let Err(e) = self.draw(frame, title, body, status) {
            debug!("panel redraw failed: {e}");
        }
    }

    fn panel_close(&self, erase: bool) {
        let Some(frame) = self.panel.lock().take() else {
            return;
        };
        if erase && frame.drawn_rows > 0 {
            let mut out = io::stdout().lock();
            let result = erase_rows(&mut out, frame.drawn_rows).and_then(|_| out.flush());
            if let Err(e) = result {
                debug!("panel erase failed: {e}");
            }
        }
    }

    fn announce(&self, message: &str) {
        let line = format!("{}\r\n", message.cyan());
        if let Some(pb) = self.spinner.lock().as_ref() {
            pb.suspend(|| write_stdout(&line));
            return;
        }
        // Printing between frames would break the in-place redraw, so start
        // the panel over below the announcement.
        if let Some(frame) = self.panel.lock().as_mut() {
            let mut out = io::stdout().lock();
            if let Err(e) = erase_rows(&mut out, frame.drawn_rows) {
                debug!("panel erase failed: {e}");
            }
            frame.drawn_rows = 0;
        }
        write_stdout(&line);
    }
}

fn write_stdout(text: &str) {
    let mut out = io::stdout().lock();
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        debug!("terminal write failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), vec!["b", "c"]);
        assert_eq!(tail_lines("a\nb", 5), vec!["a", "b"]);
        assert!(tail_lines("", 3).is_empty());
        assert!(tail_lines("a\nb", 0).is_empty());
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_panel_status_finished() {
        assert!(!PanelStatus::Running.is_finished());
        assert!(PanelStatus::Cancelled.is_finished());
    }
}
