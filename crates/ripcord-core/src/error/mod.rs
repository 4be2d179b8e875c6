//! Error types for Ripcord
//!
//! Cancellation is modelled as an error variant so it can unwind through
//! executors and the query loop with `?`, but it is not a failure: callers
//! check [`RipcordError::is_cancelled`] and report a neutral status.
//! Every other internal failure (event handler errors, chunk callback errors,
//! subprocess kill failures) is logged where it happens and never returned.

mod constructors;
mod conversions;
mod types;
mod user_messages;

pub use types::{RipcordError, RipcordResult};
pub use user_messages::{ErrorCategory, UserFriendlyError};
