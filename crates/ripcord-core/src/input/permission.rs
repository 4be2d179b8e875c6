//! Permission prompts for tool calls
//!
//! Policy (which calls need a confirmation) is supplied from outside through
//! [`PermissionPolicy`]. The gate only brackets the prompt with
//! `PERMISSION_REQUESTED` / `PERMISSION_RESOLVED` so the UI can hand the
//! terminal over, and serialises concurrent requests so modes never nest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use super::prompt::UserPrompt;
use super::state::InputState;
use crate::error::{RipcordError, RipcordResult};
use crate::events::{Event, EventBus};

/// Permission behavior types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionBehavior {
    /// Automatically allow
    Allow,
    /// Automatically deny
    Deny,
    /// Ask the user
    Ask,
}

/// Permission check result
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionResult {
    /// Tool execution allowed
    Allow,
    /// Tool execution denied
    Deny { message: String },
    /// Need to ask user
    Ask { message: String },
}

/// What the user (or policy) decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    Deny,
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allow)
    }
}

/// Decides whether a tool call may run
pub trait PermissionPolicy: Send + Sync {
    fn check(&self, tool: &str, params: &serde_json::Value) -> PermissionResult;
}

/// Per-tool behaviors with a fallback
#[derive(Debug, Clone)]
pub struct StaticPermissionPolicy {
    default: PermissionBehavior,
    per_tool: HashMap<String, PermissionBehavior>,
}

impl StaticPermissionPolicy {
    pub fn new(default: PermissionBehavior) -> Self {
        Self {
            default,
            per_tool: HashMap::new(),
        }
    }

    pub fn allow_all() -> Self {
        Self::new(PermissionBehavior::Allow)
    }

    pub fn with_tool(mut self, tool: impl Into<String>, behavior: PermissionBehavior) -> Self {
        self.per_tool.insert(tool.into(), behavior);
        self
    }
}

impl PermissionPolicy for StaticPermissionPolicy {
    fn check(&self, tool: &str, params: &serde_json::Value) -> PermissionResult {
        match self.per_tool.get(tool).copied().unwrap_or(self.default) {
            PermissionBehavior::Allow => PermissionResult::Allow,
            PermissionBehavior::Deny => PermissionResult::Deny {
                message: format!("'{tool}' is not allowed"),
            },
            PermissionBehavior::Ask => PermissionResult::Ask {
                message: format!("Allow '{tool}' to run with {params}?"),
            },
        }
    }
}

/// Runs permission prompts one at a time and announces them on the bus
pub struct PermissionGate {
    bus: EventBus,
    input: InputState,
    prompt: Arc<dyn UserPrompt>,
    policy: Arc<dyn PermissionPolicy>,
    serial: AsyncMutex<()>,
}

impl PermissionGate {
    pub fn new(
        bus: EventBus,
        input: InputState,
        prompt: Arc<dyn UserPrompt>,
        policy: Arc<dyn PermissionPolicy>,
    ) -> Self {
        Self {
            bus,
            input,
            prompt,
            policy,
            serial: AsyncMutex::new(()),
        }
    }

    /// Check policy and, if needed, ask the user.
    ///
    /// `PERMISSION_RESOLVED` is emitted for every `PERMISSION_REQUESTED`, even
    /// when the prompt itself fails.
    pub async fn authorize(
        &self,
        tool: &str,
        params: &serde_json::Value,
    ) -> RipcordResult<PermissionDecision> {
        let message = match self.policy.check(tool, params) {
            PermissionResult::Allow => return Ok(PermissionDecision::Allow),
            PermissionResult::Deny { message } => {
                debug!(tool, %message, "denied by policy");
                return Ok(PermissionDecision::Deny);
            }
            PermissionResult::Ask { message } => message,
        };

        let _serial = self.serial.lock().await;

        self.bus
            .emit(Event::permission_requested(tool, message.clone()))
            .await;

        let prompt = self.prompt.clone();
        let input = self.input.clone();
        let answer = tokio::task::spawn_blocking(move || {
            let _guard = input.enter_prompt();
            prompt.confirm(&message)
        })
        .await
        .map_err(|e| RipcordError::other(format!("permission prompt failed: {e}")))
        .and_then(|answer| answer);

        let granted = matches!(answer, Ok(true));
        self.bus
            .emit(Event::permission_resolved(tool, granted))
            .await;

        match answer {
            Ok(true) => Ok(PermissionDecision::Allow),
            Ok(false) => Ok(PermissionDecision::Deny),
            Err(e) if e.is_cancelled() => Ok(PermissionDecision::Deny),
            Err(e) => {
                warn!(tool, "permission prompt error: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct ScriptedPrompt {
        answer: RipcordResult<bool>,
        delay: Duration,
        input: InputState,
        saw_prompt_flag: Mutex<Vec<bool>>,
    }

    impl UserPrompt for ScriptedPrompt {
        fn prompt_user(&self, _message: &str) -> RipcordResult<String> {
            unreachable!("confirm is overridden")
        }

        fn confirm(&self, _message: &str) -> RipcordResult<bool> {
            self.saw_prompt_flag.lock().push(self.input.is_prompt_active());
            std::thread::sleep(self.delay);
            self.answer.clone()
        }
    }

    fn gate_with(answer: RipcordResult<bool>, delay: Duration) -> (PermissionGate, EventBus, Arc<ScriptedPrompt>) {
        let bus = EventBus::new();
        let input = InputState::new();
        let prompt = Arc::new(ScriptedPrompt {
            answer,
            delay,
            input: input.clone(),
            saw_prompt_flag: Mutex::new(Vec::new()),
        });
        let policy = StaticPermissionPolicy::allow_all().with_tool("bash", PermissionBehavior::Ask);
        let gate = PermissionGate::new(bus.clone(), input, prompt.clone(), Arc::new(policy));
        (gate, bus, prompt)
    }

    fn record(bus: &EventBus) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for event_type in [EventType::PermissionRequested, EventType::PermissionResolved] {
            let log = log.clone();
            bus.subscribe(event_type, move |event| {
                log.lock().push(event.event_type().to_string());
                Ok(())
            });
        }
        log
    }

    #[tokio::test]
    async fn test_allowed_by_policy_skips_prompt() {
        let (gate, bus, prompt) = gate_with(Ok(false), Duration::ZERO);
        let log = record(&bus);
        let decision = gate.authorize("read_file", &serde_json::json!({})).await.unwrap();
        assert_eq!(decision, PermissionDecision::Allow);
        assert!(log.lock().is_empty());
        assert!(prompt.saw_prompt_flag.lock().is_empty());
    }

    #[tokio::test]
    async fn test_ask_brackets_prompt_with_events() {
        let (gate, bus, prompt) = gate_with(Ok(true), Duration::ZERO);
        let log = record(&bus);
        let decision = gate
            .authorize("bash", &serde_json::json!({"command": "rm -rf build"}))
            .await
            .unwrap();
        assert!(decision.is_allowed());
        assert_eq!(
            *log.lock(),
            vec!["permission_requested", "permission_resolved"]
        );
        assert_eq!(*prompt.saw_prompt_flag.lock(), vec![true]);
    }

    #[tokio::test]
    async fn test_resolved_emitted_even_when_prompt_fails() {
        let (gate, bus, _prompt) = gate_with(Err(RipcordError::io("stdin closed")), Duration::ZERO);
        let log = record(&bus);
        assert!(gate.authorize("bash", &serde_json::json!({})).await.is_err());
        assert_eq!(log.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_interrupted_prompt_denies() {
        let (gate, _bus, _prompt) =
            gate_with(Err(RipcordError::cancelled("input interrupted")), Duration::ZERO);
        let decision = gate.authorize("bash", &serde_json::json!({})).await.unwrap();
        assert_eq!(decision, PermissionDecision::Deny);
    }

    #[tokio::test]
    async fn test_concurrent_requests_serialize() {
        let (gate, bus, _prompt) = gate_with(Ok(true), Duration::from_millis(30));
        let log = record(&bus);
        let gate = Arc::new(gate);

        let a = tokio::spawn({
            let gate = gate.clone();
            async move { gate.authorize("bash", &serde_json::json!({"n": 1})).await }
        });
        let b = tokio::spawn({
            let gate = gate.clone();
            async move { gate.authorize("bash", &serde_json::json!({"n": 2})).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "permission_requested",
                "permission_resolved",
                "permission_requested",
                "permission_resolved"
            ]
        );
    }
}
