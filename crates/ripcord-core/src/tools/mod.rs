//! Built-in tools

mod shell;

pub use shell::{MAX_OUTPUT_BYTES, ShellTool};
