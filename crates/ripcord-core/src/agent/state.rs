//! Agent state reported through `AGENT_STATE_CHANGED`

use serde::{Deserialize, Serialize};

/// What the agent is doing right now. Exactly one state is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Waiting for the next query
    #[default]
    Idle,
    /// Waiting on the model
    Thinking,
    /// Running a tool call
    UsingTool,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Idle => write!(f, "idle"),
            AgentState::Thinking => write!(f, "thinking"),
            AgentState::UsingTool => write!(f, "using_tool"),
        }
    }
}

impl AgentState {
    /// True while a query is being worked on
    pub fn is_active(&self) -> bool {
        !matches!(self, AgentState::Idle)
    }
}
