//! Interrupt key parsing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RipcordError;

/// Key that cancels the running query.
///
/// Written in config as `esc`, `ctrl+g`, `f9`, or a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InterruptKey {
    #[default]
    Esc,
    Ctrl(char),
    Function(u8),
    Char(char),
}

impl FromStr for InterruptKey {
    type Err = RipcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let invalid = || RipcordError::invalid_field("interrupt_key", format!("unknown key '{s}'"));

        if normalized == "esc" || normalized == "escape" {
            return Ok(InterruptKey::Esc);
        }
        if let Some(rest) = normalized.strip_prefix("ctrl+") {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => Ok(InterruptKey::Ctrl(c)),
                _ => Err(invalid()),
            };
        }
        if let Some(n) = normalized.strip_prefix('f').filter(|n| !n.is_empty()) {
            return match n.parse::<u8>() {
                Ok(n) if (1..=12).contains(&n) => Ok(InterruptKey::Function(n)),
                _ => Err(invalid()),
            };
        }
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Ok(InterruptKey::Char(c)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for InterruptKey {
    type Error = RipcordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InterruptKey> for String {
    fn from(key: InterruptKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for InterruptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptKey::Esc => write!(f, "esc"),
            InterruptKey::Ctrl(c) => write!(f, "ctrl+{c}"),
            InterruptKey::Function(n) => write!(f, "f{n}"),
            InterruptKey::Char(c) => write!(f, "{c}"),
        }
    }
}
