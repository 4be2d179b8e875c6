//! Cancellable executors
//!
//! Every unit of external work (one model turn, one tool call, one
//! subprocess) runs as its own task raced against the query's
//! [`CancellationToken`]. The token is polled at a fixed interval; when it
//! trips, the task is aborted (or the process killed) and
//! `RipcordError::Cancelled` is returned. A pre-cancelled token fails fast
//! without starting the work, and a result that arrives after the token
//! tripped is discarded in favour of the cancellation.

mod llm;
mod subprocess;
mod tool;

pub use llm::{LlmClient, LlmExecutor, LlmMessage, LlmResponse, MessageRole};
pub use subprocess::{SubprocessOutput, SubprocessSpec, run_subprocess};
pub use tool::{ChunkSink, Tool, ToolCall, ToolCallExecutor, ToolOutput, ToolSchema};

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::error::RipcordResult;
use crate::interrupt::CancellationToken;

/// Recommended polling interval: reaction well under 200ms without busy polling
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `work` as a spawned task, polling `token` every `poll_interval`.
pub async fn run_cancellable<T, F>(
    token: &CancellationToken,
    poll_interval: Duration,
    label: &str,
    work: F,
) -> RipcordResult<T>
where
    T: Send + 'static,
    F: Future<Output = RipcordResult<T>> + Send + 'static,
{
    token.raise_if_cancelled()?;

    let mut task = tokio::spawn(work);
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                if token.is_cancelled() {
                    task.abort();
                    debug!(label, "cancelled, task aborted");
                    return Err(token.to_error());
                }
            }
            joined = &mut task => {
                let result = joined?;
                if token.is_cancelled() {
                    debug!(label, "completed after cancellation, result discarded");
                    return Err(token.to_error());
                }
                return result;
            }
        }
    }
}

#[cfg(test)]
mod tests;
