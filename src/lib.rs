//! Ripcord
//!
//! Interruptible, reactive terminal runtime for LLM coding agents. This crate
//! re-exports [`ripcord_core`]; the `ripcord` binary lives in `ripcord-cli`.

pub use ripcord_core::*;
