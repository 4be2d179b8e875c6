//! Terminal prompt
//!
//! A small line editor on top of `console` so ESC can abandon the line, and
//! `dialoguer` for yes/no permission questions.

use colored::*;
use console::{Key, Term};
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use ripcord_core::error::{RipcordError, RipcordResult};
use ripcord_core::input::UserPrompt;
use ripcord_core::interrupt::{SIGINT_REASON, USER_INTERRUPT_REASON};
use std::io::BufRead;

/// Reads queries and confirmations from the controlling terminal
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    fn read_interactive(&self, message: &str) -> RipcordResult<String> {
        self.term.write_str(&format!("{} ", message.cyan().bold()))?;
        let mut line = String::new();
        loop {
            match self.term.read_key()? {
                Key::Enter => {
                    self.term.write_str("\r\n")?;
                    return Ok(line);
                }
                Key::Escape => {
                    self.term.clear_line()?;
                    return Err(RipcordError::cancelled(USER_INTERRUPT_REASON));
                }
                Key::CtrlC => {
                    self.term.write_str("\r\n")?;
                    return Err(RipcordError::cancelled(SIGINT_REASON));
                }
                Key::Backspace => {
                    if line.pop().is_some() {
                        self.term.clear_chars(1)?;
                    }
                }
                Key::Char(c) if !c.is_control() => {
                    line.push(c);
                    self.term.write_str(c.encode_utf8(&mut [0; 4]))?;
                }
                _ => {}
            }
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl UserPrompt for TerminalPrompt {
    fn prompt_user(&self, message: &str) -> RipcordResult<String> {
        if self.term.is_term() {
            return self.read_interactive(message);
        }

        // Piped input: plain lines, end of input ends the session like Ctrl+C.
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(RipcordError::cancelled(SIGINT_REASON));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn confirm(&self, message: &str) -> RipcordResult<bool> {
        if !self.term.is_term() {
            let answer = self.prompt_user(&format!("{message} [y/N]"))?;
            return Ok(matches!(
                answer.trim().to_ascii_lowercase().as_str(),
                "y" | "yes"
            ));
        }

        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(false)
            .interact_opt()
            .map_err(|e| RipcordError::io(format!("confirmation prompt failed: {e}")))?;
        match answer {
            Some(answer) => Ok(answer),
            // ESC or q
            None => Err(RipcordError::cancelled(USER_INTERRUPT_REASON)),
        }
    }
}
