//! Offline model stand-in
//!
//! Turns `!command` into a shell tool call and echoes everything else, with a
//! short delay so the thinking spinner and interrupt key can be tried out
//! without network access.

use async_trait::async_trait;
use ripcord_core::error::RipcordResult;
use ripcord_core::executor::{LlmClient, LlmMessage, LlmResponse, MessageRole, ToolSchema};
use ripcord_core::interrupt::CancellationToken;
use ripcord_core::ToolCall;
use std::time::Duration;

pub struct DemoLlm {
    latency: Duration,
}

impl DemoLlm {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn respond(messages: &[LlmMessage], tools: &[ToolSchema]) -> LlmResponse {
        let Some(last) = messages.last() else {
            return LlmResponse::text("Nothing to do.");
        };

        match last.role {
            MessageRole::Tool => {
                let lines = last.content.lines().count();
                LlmResponse::text(format!("The command finished ({lines} lines of output)."))
            }
            MessageRole::User => match last.content.trim().strip_prefix('!') {
                Some(command) if tools.iter().any(|t| t.name == "shell") => {
                    LlmResponse::text("").with_tool_call(ToolCall::new(
                        "shell",
                        serde_json::json!({ "command": command.trim() }),
                    ))
                }
                _ => LlmResponse::text(format!("You said: {}", last.content.trim())),
            },
            _ => LlmResponse::text("Nothing to do."),
        }
    }
}

#[async_trait]
impl LlmClient for DemoLlm {
    async fn run_llm_turn(
        &self,
        messages: Vec<LlmMessage>,
        tools: Vec<ToolSchema>,
        _token: CancellationToken,
    ) -> RipcordResult<LlmResponse> {
        tokio::time::sleep(self.latency).await;
        Ok(Self::respond(&messages, &tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_schema() -> Vec<ToolSchema> {
        vec![ToolSchema {
            name: "shell".to_string(),
            description: "run a command".to_string(),
        }]
    }

    #[test]
    fn test_bang_becomes_shell_call() {
        let response = DemoLlm::respond(&[LlmMessage::user("!ls -la")], &shell_schema());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "shell");
        assert_eq!(
            response.tool_calls[0].get_string("command").as_deref(),
            Some("ls -la")
        );
    }

    #[test]
    fn test_plain_text_is_echoed() {
        let response = DemoLlm::respond(&[LlmMessage::user("hello")], &shell_schema());
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.content, "You said: hello");
    }

    #[test]
    fn test_tool_result_ends_the_turn() {
        let messages = vec![
            LlmMessage::user("!echo hi"),
            LlmMessage::tool_result("call-1", "hi\n"),
        ];
        let response = DemoLlm::respond(&messages, &shell_schema());
        assert!(response.tool_calls.is_empty());
        assert!(response.content.contains("1 lines"));
    }

    #[tokio::test]
    async fn test_turn_waits_for_latency() {
        let llm = DemoLlm::new(Duration::from_millis(50));
        let start = std::time::Instant::now();
        llm.run_llm_turn(vec![LlmMessage::user("hi")], vec![], CancellationToken::new())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
