//! Synchronous input boundary
//!
//! The runtime never reads the terminal itself. It only needs to know when a
//! synchronous prompt owns the terminal ([`InputState`]) and to bracket
//! permission prompts with events ([`PermissionGate`]).

mod permission;
mod prompt;
mod state;

pub use permission::{
    PermissionBehavior, PermissionDecision, PermissionGate, PermissionPolicy, PermissionResult,
    StaticPermissionPolicy,
};
pub use prompt::UserPrompt;
pub use state::{InputState, PromptGuard};
