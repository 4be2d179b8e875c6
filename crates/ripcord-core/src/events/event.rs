//! Event values carried by the bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

use crate::agent::AgentState;

/// Closed set of event kinds understood by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Payload: `state`, optional `tool`
    AgentStateChanged,
    /// Payload: `tool`, `call_id`
    ToolSelected,
    /// Payload: `tool`, `text`
    ToolOutputChunk,
    /// Payload: `tool`, `success`, optional `exit_code`
    ToolCompleted,
    /// Payload: `tool`, `message`
    ToolError,
    /// Payload: `tool`, `message`
    PermissionRequested,
    /// Payload: `tool`, `granted`
    PermissionResolved,
    UserInputPaused,
    UserInputResumed,
    /// Payload: `reason`
    ExecutionCancelled,
}

impl EventType {
    pub const ALL: [EventType; 10] = [
        EventType::AgentStateChanged,
        EventType::ToolSelected,
        EventType::ToolOutputChunk,
        EventType::ToolCompleted,
        EventType::ToolError,
        EventType::PermissionRequested,
        EventType::PermissionResolved,
        EventType::UserInputPaused,
        EventType::UserInputResumed,
        EventType::ExecutionCancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentStateChanged => "agent_state_changed",
            Self::ToolSelected => "tool_selected",
            Self::ToolOutputChunk => "tool_output_chunk",
            Self::ToolCompleted => "tool_completed",
            Self::ToolError => "tool_error",
            Self::PermissionRequested => "permission_requested",
            Self::PermissionResolved => "permission_resolved",
            Self::UserInputPaused => "user_input_paused",
            Self::UserInputResumed => "user_input_resumed",
            Self::ExecutionCancelled => "execution_cancelled",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published event. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_type: EventType,
    timestamp: DateTime<Utc>,
    data: Map<String, Value>,
    source: String,
}

impl Event {
    pub fn new(event_type: EventType, source: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data: Map::new(),
            source: source.into(),
        }
    }

    /// Attach a payload field (builder style, before publishing)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    /// The agent state carried by `AGENT_STATE_CHANGED`
    pub fn agent_state(&self) -> Option<AgentState> {
        self.data
            .get("state")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    // ========== Constructors ==========

    pub fn agent_state_changed(state: AgentState, tool: Option<&str>) -> Self {
        let event = Self::new(EventType::AgentStateChanged, "agent").with("state", json!(state));
        match tool {
            Some(tool) => event.with("tool", tool),
            None => event,
        }
    }

    pub fn tool_selected(tool: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self::new(EventType::ToolSelected, "agent")
            .with("tool", tool.into())
            .with("call_id", call_id.into())
    }

    pub fn tool_output_chunk(tool: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EventType::ToolOutputChunk, "tool")
            .with("tool", tool.into())
            .with("text", text.into())
    }

    pub fn tool_completed(tool: impl Into<String>, success: bool, exit_code: Option<i32>) -> Self {
        let event = Self::new(EventType::ToolCompleted, "tool")
            .with("tool", tool.into())
            .with("success", success);
        match exit_code {
            Some(code) => event.with("exit_code", code),
            None => event,
        }
    }

    pub fn tool_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventType::ToolError, "tool")
            .with("tool", tool.into())
            .with("message", message.into())
    }

    pub fn permission_requested(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventType::PermissionRequested, "permission")
            .with("tool", tool.into())
            .with("message", message.into())
    }

    pub fn permission_resolved(tool: impl Into<String>, granted: bool) -> Self {
        Self::new(EventType::PermissionResolved, "permission")
            .with("tool", tool.into())
            .with("granted", granted)
    }

    pub fn user_input_paused() -> Self {
        Self::new(EventType::UserInputPaused, "input")
    }

    pub fn user_input_resumed() -> Self {
        Self::new(EventType::UserInputResumed, "input")
    }

    pub fn execution_cancelled(reason: impl Into<String>) -> Self {
        Self::new(EventType::ExecutionCancelled, "agent").with("reason", reason.into())
    }
}
