//! Runtime configuration
//!
//! Only a handful of knobs are tunable: the interrupt key, the renderer
//! refresh interval, the executor polling interval, the step limit for one
//! query, the shell used by the shell tool, and logging.
//!
//! Precedence: defaults, then the config file, then `RIPCORD_*` environment
//! variables, then command-line flags (applied by the CLI).

mod interrupt_key;
mod loader;
mod logging_config;
mod model;

pub use interrupt_key::InterruptKey;
pub use loader::{default_config_path, load_config, load_from_env, load_from_file};
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REFRESH_INTERVAL_MS, MAX_INTERVAL_MS, MIN_INTERVAL_MS,
    RuntimeConfig,
};
