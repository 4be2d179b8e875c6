//! Cooperative cancellation
//!
//! One [`CancellationToken`] is minted per user query by the
//! [`ExecutionSession`]. Work polls the token; the global key monitor (or
//! SIGINT handler) trips it from another thread through
//! [`ExecutionSession::cancel_all`].

mod session;
mod token;

pub use session::ExecutionSession;
pub use token::CancellationToken;

/// Reason recorded when the interrupt key is pressed
pub const USER_INTERRUPT_REASON: &str = "interrupted by user";

/// Reason recorded when SIGINT arrives during execution
pub const SIGINT_REASON: &str = "interrupted by Ctrl+C";

#[cfg(test)]
mod tests;
