//! CLI argument definitions using clap

use clap::Parser;
use ripcord_core::config::{InterruptKey, RuntimeConfig};
use ripcord_core::error::RipcordResult;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ripcord")]
#[command(about = "Ripcord - interruptible terminal agent runtime")]
#[command(
    long_about = r#"Ripcord - interruptible terminal agent runtime

USAGE:
  ripcord                        # Start interactive mode
  ripcord "your query"           # Run one query, then exit
  ripcord --interrupt-key f2     # Use F2 instead of ESC to cancel

While a query runs, press the interrupt key (ESC by default) or Ctrl+C to
cancel it. Lines starting with `!` run as shell commands."#
)]
#[command(version)]
pub struct Cli {
    /// Query to run once (omit for the interactive prompt)
    pub query: Option<String>,

    /// Path to configuration file (TOML, YAML or JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Interrupt key: esc, ctrl+<char>, f<1-12> or a single character
    #[arg(long, value_name = "KEY")]
    pub interrupt_key: Option<InterruptKey>,

    /// Live panel refresh interval in milliseconds
    #[arg(long = "refresh-ms", value_name = "MS")]
    pub refresh_ms: Option<u64>,

    /// Cancellation polling interval in milliseconds
    #[arg(long = "poll-ms", value_name = "MS")]
    pub poll_ms: Option<u64>,

    /// Maximum model turns per query
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Shell used for `!` commands
    #[arg(long)]
    pub shell: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Approve every tool call without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Command-line flags win over file and environment settings
    pub fn apply(&self, mut config: RuntimeConfig) -> RipcordResult<RuntimeConfig> {
        if let Some(key) = self.interrupt_key {
            config.interrupt_key = key;
        }
        if let Some(ms) = self.refresh_ms {
            config.refresh_interval_ms = ms;
        }
        if let Some(ms) = self.poll_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(steps) = self.max_steps {
            config.max_steps = steps;
        }
        if let Some(shell) = &self.shell {
            config.shell = shell.clone();
        }
        if let Some(path) = &self.log_file {
            config.logging.log_file = Some(path.clone());
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "ripcord",
            "--interrupt-key",
            "ctrl+g",
            "--refresh-ms",
            "50",
            "--yes",
        ]);
        let config = cli.apply(RuntimeConfig::default()).unwrap();
        assert_eq!(config.interrupt_key, InterruptKey::Ctrl('g'));
        assert_eq!(config.refresh_interval_ms, 50);
        assert_eq!(config.poll_interval_ms, 100);
        assert!(cli.yes);
    }

    #[test]
    fn test_out_of_range_interval_rejected() {
        let cli = Cli::parse_from(["ripcord", "--poll-ms", "5"]);
        assert!(cli.apply(RuntimeConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_key_rejected_by_parser() {
        assert!(Cli::try_parse_from(["ripcord", "--interrupt-key", "hyper+x"]).is_err());
    }

    #[test]
    fn test_one_shot_query() {
        let cli = Cli::parse_from(["ripcord", "!ls"]);
        assert_eq!(cli.query.as_deref(), Some("!ls"));
    }
}
