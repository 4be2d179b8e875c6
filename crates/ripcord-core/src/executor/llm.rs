//! Model turn executor
//!
//! Prompt construction and response parsing belong to the [`LlmClient`]
//! implementation; this side only needs to know that a turn happened and
//! which tool calls it asked for.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::run_cancellable;
use super::tool::{ToolCall, ToolSchema};
use crate::error::RipcordResult;
use crate::interrupt::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: String,
    /// Set on `Tool` messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// What one turn produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// External model client
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one request/response turn. Implementations may check `token`
    /// themselves but are not required to.
    async fn run_llm_turn(
        &self,
        messages: Vec<LlmMessage>,
        tools: Vec<ToolSchema>,
        token: CancellationToken,
    ) -> RipcordResult<LlmResponse>;
}

/// Runs model turns as cancellable tasks
#[derive(Clone)]
pub struct LlmExecutor {
    client: Arc<dyn LlmClient>,
    poll_interval: Duration,
}

impl LlmExecutor {
    pub fn new(client: Arc<dyn LlmClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn run_turn(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolSchema],
        token: &CancellationToken,
    ) -> RipcordResult<LlmResponse> {
        let client = self.client.clone();
        let messages = messages.to_vec();
        let tools = tools.to_vec();
        let task_token = token.clone();
        run_cancellable(token, self.poll_interval, "llm_turn", async move {
            client.run_llm_turn(messages, tools, task_token).await
        })
        .await
    }
}
