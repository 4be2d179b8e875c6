//! Shell command tool

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument;

use crate::error::{RipcordError, RipcordResult};
use crate::executor::{ChunkSink, SubprocessSpec, Tool, ToolOutput, run_subprocess};
use crate::interrupt::CancellationToken;

/// Output handed back to the model, in bytes; longer output keeps its tail
pub const MAX_OUTPUT_BYTES: usize = 30_000;

/// Runs `<shell> -c <command>`, streaming every output line.
///
/// Cancellation kills the command's whole process group.
#[derive(Debug, Clone)]
pub struct ShellTool {
    shell: String,
    working_dir: Option<PathBuf>,
    poll_interval: Duration,
}

impl ShellTool {
    pub fn new(shell: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            shell: shell.into(),
            working_dir: None,
            poll_interval,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run a shell command. Params: {\"command\": \"...\"}. Output streams live and \
         long output keeps only its tail."
    }

    #[instrument(skip_all, fields(command_preview = tracing::field::Empty))]
    async fn execute(
        &self,
        params: serde_json::Value,
        on_chunk: ChunkSink,
        token: CancellationToken,
    ) -> RipcordResult<ToolOutput> {
        let command = params
            .get("command")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RipcordError::invalid_field("command", "missing shell command"))?;
        tracing::Span::current().record(
            "command_preview",
            command.chars().take(50).collect::<String>().as_str(),
        );

        let mut spec = SubprocessSpec::shell(&self.shell, command).output_limit(MAX_OUTPUT_BYTES);
        if let Some(dir) = &self.working_dir {
            spec = spec.working_dir(dir);
        }

        let result = run_subprocess(&spec, &on_chunk, &token, self.poll_interval).await?;
        let content = if result.truncated_chars > 0 {
            format!(
                "... [{} characters truncated] ...\n{}",
                result.truncated_chars, result.output
            )
        } else {
            result.output.clone()
        };

        let output = if result.success() {
            ToolOutput::success(content)
        } else {
            ToolOutput::failure(content)
        };
        Ok(output.with_exit_code(result.exit_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_command_rejected() {
        let tool = ShellTool::new("sh", Duration::from_millis(20));
        let err = tool
            .execute(serde_json::json!({}), ChunkSink::noop(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RipcordError::InvalidInput { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_command_and_streams() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = ShellTool::new("sh", Duration::from_millis(20)).with_working_dir(dir.path());
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let sink_chunks = chunks.clone();
        let sink = ChunkSink::new("shell", move |c| {
            sink_chunks.lock().push(c.to_string());
            Ok(())
        });

        let output = tool
            .execute(
                serde_json::json!({"command": "echo hello; echo world"}),
                sink,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.content, "hello\nworld\n");
        assert_eq!(*chunks.lock(), vec!["hello\n", "world\n"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let tool = ShellTool::new("sh", Duration::from_millis(20));
        let output = tool
            .execute(
                serde_json::json!({"command": "echo oops; exit 2"}),
                ChunkSink::noop(),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_long_output_keeps_tail() {
        let tool = ShellTool::new("sh", Duration::from_millis(20));
        let output = tool
            .execute(
                serde_json::json!({"command": "seq 1 20000"}),
                ChunkSink::noop(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(output.success);
        assert!(output.content.starts_with("... ["));
        assert!(output.content.ends_with("\n20000\n"));
        assert!(!output.content.contains("\n1\n"));
        assert!(output.content.len() < MAX_OUTPUT_BYTES + 64);
    }
}
