//! Tool call executor

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use super::run_cancellable;
use crate::error::{RipcordError, RipcordResult};
use crate::interrupt::CancellationToken;

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            params,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

/// Tool description handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
}

/// Final result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            exit_code: None,
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: false,
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }
}

type ChunkCallback = dyn Fn(&str) -> anyhow::Result<()> + Send + Sync;

/// Streaming output callback handed to tools.
///
/// A failing or panicking callback is logged and ignored so a rendering bug
/// can never abort a running command.
#[derive(Clone)]
pub struct ChunkSink {
    tool: Arc<str>,
    callback: Arc<ChunkCallback>,
}

impl ChunkSink {
    pub fn new<F>(tool: &str, callback: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            tool: Arc::from(tool),
            callback: Arc::new(callback),
        }
    }

    /// A sink that drops every chunk
    pub fn noop() -> Self {
        Self::new("", |_| Ok(()))
    }

    pub fn emit(&self, text: &str) {
        match std::panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(text))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(tool = %self.tool, "chunk callback failed: {e:#}"),
            Err(_) => warn!(tool = %self.tool, "chunk callback panicked"),
        }
    }
}

impl std::fmt::Debug for ChunkSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSink").field("tool", &self.tool).finish()
    }
}

/// An executable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the tool. Tools that stream call `on_chunk`; others just return.
    async fn execute(
        &self,
        params: serde_json::Value,
        on_chunk: ChunkSink,
        token: CancellationToken,
    ) -> RipcordResult<ToolOutput>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Registry of tools that runs calls as cancellable tasks
#[derive(Clone)]
pub struct ToolCallExecutor {
    tools: HashMap<String, Arc<dyn Tool>>,
    poll_interval: Duration,
}

impl ToolCallExecutor {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            tools: HashMap::new(),
            poll_interval,
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    #[instrument(skip(self, on_chunk, token), fields(tool = %call.name, call_id = %call.id))]
    pub async fn execute(
        &self,
        call: &ToolCall,
        on_chunk: ChunkSink,
        token: &CancellationToken,
    ) -> RipcordResult<ToolOutput> {
        token.raise_if_cancelled()?;

        let tool = self
            .tools
            .get(&call.name)
            .cloned()
            .ok_or_else(|| RipcordError::tool(&call.name, "unknown tool"))?;

        let params = call.params.clone();
        let task_token = token.clone();
        run_cancellable(token, self.poll_interval, &call.name, async move {
            tool.execute(params, on_chunk, task_token).await
        })
        .await
    }
}
