//! Configuration loading from files and environment

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::model::RuntimeConfig;
use crate::error::{RipcordError, RipcordResult};

/// `~/.config/ripcord/config.toml` (platform config dir)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ripcord").join("config.toml"))
}

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> RipcordResult<RuntimeConfig> {
    if !path.exists() {
        return Ok(RuntimeConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        RipcordError::config(format!("cannot read {}: {e}", path.display()))
    })?;

    let parse_error = |format: &str, e: String| {
        RipcordError::config(format!("invalid {format} in {}: {e}", path.display()))
    };
    let config: RuntimeConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => {
            toml::from_str(&content).map_err(|e| parse_error("TOML", e.to_string()))?
        }
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| parse_error("YAML", e.to_string()))?
        }
        _ => serde_json::from_str(&content).map_err(|e| parse_error("JSON", e.to_string()))?,
    };

    Ok(config)
}

/// Apply `RIPCORD_*` environment overrides on top of `config`
pub fn load_from_env(mut config: RuntimeConfig) -> RipcordResult<RuntimeConfig> {
    apply_env(&mut config, |key| env::var(key).ok())?;
    Ok(config)
}

fn apply_env(
    config: &mut RuntimeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> RipcordResult<()> {
    if let Some(key) = lookup("RIPCORD_INTERRUPT_KEY") {
        config.interrupt_key = key.parse()?;
    }
    if let Some(ms) = lookup("RIPCORD_REFRESH_INTERVAL_MS") {
        config.refresh_interval_ms = parse_number("RIPCORD_REFRESH_INTERVAL_MS", &ms)?;
    }
    if let Some(ms) = lookup("RIPCORD_POLL_INTERVAL_MS") {
        config.poll_interval_ms = parse_number("RIPCORD_POLL_INTERVAL_MS", &ms)?;
    }
    if let Some(steps) = lookup("RIPCORD_MAX_STEPS") {
        config.max_steps = parse_number("RIPCORD_MAX_STEPS", &steps)?;
    }
    if let Some(shell) = lookup("RIPCORD_SHELL") {
        config.shell = shell;
    }
    if let Some(level) = lookup("RIPCORD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(file) = lookup("RIPCORD_LOG_FILE") {
        config.logging.log_file = Some(PathBuf::from(shellexpand::tilde(&file).as_ref()));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> RipcordResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RipcordError::config(format!("Invalid {var} value: '{value}'")))
}

/// Defaults, then `path` (or the default location), then the environment.
/// The result is validated.
pub fn load_config(path: Option<&Path>) -> RipcordResult<RuntimeConfig> {
    let config = match path {
        Some(path) => {
            let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
            if !expanded.exists() {
                return Err(RipcordError::config(format!(
                    "Config file not found: {}",
                    expanded.display()
                )));
            }
            load_from_file(&expanded)?
        }
        None => match default_config_path() {
            Some(path) => load_from_file(&path)?,
            None => RuntimeConfig::default(),
        },
    };

    let config = load_from_env(config)?;
    config.validate()?;
    Ok(config)
}
