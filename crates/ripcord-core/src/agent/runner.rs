//! Query loop
//!
//! One user query is a bounded loop of model turns and tool calls. All of it
//! runs under the token minted by [`ExecutionSession::start_new_execution`];
//! the first `Cancelled` error unwinds the whole query, which then reports
//! `EXECUTION_CANCELLED` instead of any partial result.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::state::AgentState;
use crate::error::{RipcordError, RipcordResult, UserFriendlyError};
use crate::events::{Event, EventBus};
use crate::executor::{ChunkSink, LlmExecutor, LlmMessage, ToolCall, ToolCallExecutor};
use crate::input::PermissionGate;
use crate::interrupt::{CancellationToken, ExecutionSession};

/// How a query ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Completed { response: String },
    Cancelled { reason: String },
    Failed { message: String },
}

impl QueryOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryOutcome::Cancelled { .. })
    }
}

/// Drives queries through the model and tools
pub struct QueryRunner {
    bus: EventBus,
    session: Arc<ExecutionSession>,
    llm: LlmExecutor,
    tools: ToolCallExecutor,
    permissions: Arc<PermissionGate>,
    max_steps: u32,
    history: Mutex<Vec<LlmMessage>>,
}

impl QueryRunner {
    pub fn new(
        bus: EventBus,
        session: Arc<ExecutionSession>,
        llm: LlmExecutor,
        tools: ToolCallExecutor,
        permissions: Arc<PermissionGate>,
    ) -> Self {
        Self {
            bus,
            session,
            llm,
            tools,
            permissions,
            max_steps: 20,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Messages of all completed queries so far
    pub fn history(&self) -> Vec<LlmMessage> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Run one user query to completion, cancellation or failure. Always
    /// leaves the agent in `IDLE`.
    #[instrument(skip(self, text), fields(query_len = text.len()))]
    pub async fn run_query(&self, text: &str) -> QueryOutcome {
        let token = self.session.start_new_execution();

        let outcome = match self.drive(text, &token).await {
            Ok(response) => QueryOutcome::Completed { response },
            Err(e) if e.is_cancelled() => {
                let reason = e.cancel_reason().unwrap_or("cancelled").to_string();
                info!(%reason, "query cancelled");
                self.bus.emit(Event::execution_cancelled(&reason)).await;
                QueryOutcome::Cancelled { reason }
            }
            Err(e) => {
                warn!("query failed: {e}");
                QueryOutcome::Failed {
                    message: UserFriendlyError::from(&e).one_line(),
                }
            }
        };

        self.set_state(AgentState::Idle, None).await;
        outcome
    }

    async fn drive(&self, text: &str, token: &CancellationToken) -> RipcordResult<String> {
        let mut messages = self.history.lock().clone();
        messages.push(LlmMessage::user(text));
        let schemas = self.tools.schemas();

        for step in 1..=self.max_steps {
            debug!(step, "model turn");
            self.set_state(AgentState::Thinking, None).await;
            let response = self.llm.run_turn(&messages, &schemas, token).await?;
            messages.push(LlmMessage::assistant(&response.content));

            if response.tool_calls.is_empty() {
                *self.history.lock() = messages;
                return Ok(response.content);
            }

            for call in &response.tool_calls {
                let result = self.run_tool_call(call, token).await?;
                messages.push(LlmMessage::tool_result(&call.id, result));
            }
        }

        Err(RipcordError::other(format!(
            "stopped after {} steps without a final answer",
            self.max_steps
        )))
    }

    /// Run one tool call and return what the model should see. Only
    /// cancellation is returned as an error; tool failures become text.
    async fn run_tool_call(
        &self,
        call: &ToolCall,
        token: &CancellationToken,
    ) -> RipcordResult<String> {
        self.bus
            .emit(Event::tool_selected(&call.name, &call.id))
            .await;

        let decision = self.permissions.authorize(&call.name, &call.params).await?;
        token.raise_if_cancelled()?;
        if !decision.is_allowed() {
            self.bus
                .emit(Event::tool_error(&call.name, "permission denied"))
                .await;
            return Ok(format!("The user denied permission to run '{}'", call.name));
        }

        self.set_state(AgentState::UsingTool, Some(&call.name)).await;

        // Tools call the sink from their own task; chunks cross back here
        // through the channel and are published in order.
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let sink = ChunkSink::new(&call.name, move |text| {
            tx.send(text.to_string())
                .map_err(|_| anyhow::anyhow!("chunk receiver closed"))
        });

        let execution = self.tools.execute(call, sink, token);
        tokio::pin!(execution);
        let result = loop {
            tokio::select! {
                result = &mut execution => break result,
                Some(text) = rx.recv() => {
                    self.bus.emit(Event::tool_output_chunk(&call.name, text)).await;
                }
            }
        };

        match result {
            Ok(output) => {
                while let Ok(text) = rx.try_recv() {
                    self.bus
                        .emit(Event::tool_output_chunk(&call.name, text))
                        .await;
                }
                self.bus
                    .emit(Event::tool_completed(
                        &call.name,
                        output.success,
                        output.exit_code,
                    ))
                    .await;
                Ok(output.content)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.bus
                    .emit(Event::tool_error(&call.name, e.to_string()))
                    .await;
                Ok(format!("Error: {e}"))
            }
        }
    }

    async fn set_state(&self, state: AgentState, tool: Option<&str>) {
        self.bus.emit(Event::agent_state_changed(state, tool)).await;
    }
}
