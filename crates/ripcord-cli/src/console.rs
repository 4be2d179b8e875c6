//! CLI console utilities
//!
//! The key monitor keeps the terminal in raw mode while no prompt is open,
//! so every line ends with `\r\n`.

use colored::*;
use std::io::{self, Write};

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            self.line(&format!("{} {}", "ℹ".blue().bold(), message));
        }
    }

    pub fn success(&self, message: &str) {
        self.line(&format!("{} {}", "✓".green().bold(), message.green()));
    }

    pub fn cancelled(&self, message: &str) {
        self.line(&format!("{} {}", "⏹".yellow().bold(), message.yellow()));
    }

    pub fn warn(&self, message: &str) {
        self.line(&format!("{} {}", "⚠".yellow().bold(), message.yellow()));
    }

    pub fn error(&self, message: &str) {
        let text = format!("{} {}\r\n", "✗".red().bold(), message.red());
        let mut err = io::stderr().lock();
        let _ = err.write_all(text.as_bytes());
        let _ = err.flush();
    }

    pub fn hint(&self, message: &str) {
        self.line(&message.dimmed().to_string());
    }

    /// Multi-line text such as a model response
    pub fn print_block(&self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    pub fn print_header(&self, title: &str) {
        self.line("");
        self.line(&title.bold().underline().to_string());
        self.line(&"=".repeat(title.len()).dimmed().to_string());
    }

    fn line(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "{text}\r\n");
        let _ = out.flush();
    }
}
