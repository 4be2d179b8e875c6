//! Ripcord Core Library
//!
//! Reactive execution core for an interactive agent CLI: the event bus,
//! per-query cancellation, the global interrupt key monitor, cancellable
//! executors for model turns and tool calls, and the terminal renderer with
//! its REACTIVE/INTERACTIVE mode switch.

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod input;
pub mod interrupt;
pub mod monitor;
pub mod tools;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use agent::{AgentState, QueryOutcome, QueryRunner};
pub use config::{InterruptKey, LoggingConfig, RuntimeConfig};
pub use error::{RipcordError, RipcordResult, UserFriendlyError};
pub use events::{Event, EventBus, EventType};
pub use executor::{
    ChunkSink, LlmClient, LlmExecutor, LlmMessage, LlmResponse, Tool, ToolCall, ToolCallExecutor,
    ToolOutput,
};
pub use input::{InputState, PermissionGate, UserPrompt};
pub use interrupt::{CancellationToken, ExecutionSession};
pub use monitor::{CrosstermKeySource, KeyMonitor, KeyMonitorHandle};
pub use tools::ShellTool;
pub use ui::{InterfaceManager, Renderer, TerminalRenderer, UiCoordinator, UiMode};
