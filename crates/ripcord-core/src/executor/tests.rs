use super::*;
use crate::error::RipcordError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

const POLL: Duration = Duration::from_millis(20);

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn cancel_after(token: &CancellationToken, delay: Duration) {
    let token = token.clone();
    std::thread::spawn(move || {
        std::thread::sleep(delay);
        token.cancel("ESC pressed");
    });
}

#[tokio::test]
async fn test_pre_cancelled_token_never_starts_work() {
    let token = CancellationToken::new();
    token.cancel("already");
    let started = Arc::new(AtomicBool::new(false));

    let flag = started.clone();
    let result = run_cancellable(&token, POLL, "test", async move {
        flag.store(true, Ordering::SeqCst);
        Ok(42)
    })
    .await;

    assert_eq!(result.unwrap_err().cancel_reason(), Some("already"));
    tokio::task::yield_now().await;
    assert!(!started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_completes_when_not_cancelled() {
    let token = CancellationToken::new();
    let result = run_cancellable(&token, POLL, "test", async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok("done")
    })
    .await;
    assert_eq!(result.unwrap(), "done");
}

#[tokio::test]
async fn test_cancellation_aborts_task_promptly() {
    let token = CancellationToken::new();
    let dropped = Arc::new(AtomicBool::new(false));
    cancel_after(&token, Duration::from_millis(100));

    let guard = SetOnDrop(dropped.clone());
    let start = Instant::now();
    let result: RipcordResult<()> = run_cancellable(&token, POLL, "slow", async move {
        let _guard = guard;
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    })
    .await;

    assert!(result.unwrap_err().is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(dropped.load(Ordering::SeqCst), "aborted task should be dropped");
}

#[tokio::test]
async fn test_cancellation_wins_over_late_result() {
    let token = CancellationToken::new();
    let inner = token.clone();
    let result = run_cancellable(&token, Duration::from_secs(5), "race", async move {
        inner.cancel("tripped mid-flight");
        Ok("partial")
    })
    .await;
    assert_eq!(result.unwrap_err().cancel_reason(), Some("tripped mid-flight"));
}

#[tokio::test]
async fn test_work_errors_propagate() {
    let token = CancellationToken::new();
    let result: RipcordResult<()> = run_cancellable(&token, POLL, "failing", async {
        Err(RipcordError::llm("rate limited"))
    })
    .await;
    assert_eq!(result.unwrap_err(), RipcordError::llm("rate limited"));
}

struct SlowClient;

#[async_trait]
impl LlmClient for SlowClient {
    async fn run_llm_turn(
        &self,
        messages: Vec<LlmMessage>,
        _tools: Vec<ToolSchema>,
        _token: CancellationToken,
    ) -> RipcordResult<LlmResponse> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(LlmResponse::text(format!("saw {} messages", messages.len())))
    }
}

#[tokio::test]
async fn test_llm_executor_runs_turn() {
    let executor = LlmExecutor::new(Arc::new(SlowClient), POLL);
    let token = CancellationToken::new();
    let response = executor
        .run_turn(&[LlmMessage::user("hi")], &[], &token)
        .await
        .unwrap();
    assert_eq!(response.content, "saw 1 messages");
}

#[tokio::test]
async fn test_llm_executor_cancelled() {
    let executor = LlmExecutor::new(Arc::new(SlowClient), POLL);
    let token = CancellationToken::new();
    cancel_after(&token, Duration::from_millis(10));
    let err = executor
        .run_turn(&[LlmMessage::user("hi")], &[], &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

struct ChattyTool;

#[async_trait]
impl Tool for ChattyTool {
    fn name(&self) -> &str {
        "chatty"
    }

    fn description(&self) -> &str {
        "emits three chunks"
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        on_chunk: ChunkSink,
        _token: CancellationToken,
    ) -> RipcordResult<ToolOutput> {
        for chunk in ["a", "b", "c"] {
            on_chunk.emit(chunk);
        }
        Ok(ToolOutput::success("abc"))
    }
}

#[tokio::test]
async fn test_failing_chunk_callback_does_not_abort_tool() {
    let executor = ToolCallExecutor::new(POLL).with_tool(Arc::new(ChattyTool));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink = ChunkSink::new("chatty", move |chunk| {
        sink_seen.lock().push(chunk.to_string());
        if chunk == "a" {
            anyhow::bail!("renderer bug");
        }
        if chunk == "b" {
            panic!("renderer panic");
        }
        Ok(())
    });

    let token = CancellationToken::new();
    let output = executor
        .execute(&ToolCall::new("chatty", serde_json::json!({})), sink, &token)
        .await
        .unwrap();
    assert!(output.success);
    assert_eq!(*seen.lock(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_unknown_tool() {
    let executor = ToolCallExecutor::new(POLL);
    let token = CancellationToken::new();
    let err = executor
        .execute(&ToolCall::new("nope", serde_json::json!({})), ChunkSink::noop(), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, RipcordError::Tool { .. }));
}

#[tokio::test]
async fn test_schemas_sorted() {
    let executor = ToolCallExecutor::new(POLL).with_tool(Arc::new(ChattyTool));
    let schemas = executor.schemas();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].name, "chatty");
}

#[cfg(unix)]
mod subprocess_tests {
    use super::*;

    fn collecting_sink() -> (ChunkSink, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = lines.clone();
        let sink = ChunkSink::new("sh", move |chunk| {
            sink_lines.lock().push(chunk.to_string());
            Ok(())
        });
        (sink, lines)
    }

    #[tokio::test]
    async fn test_streams_lines_and_exit_code() {
        let (sink, lines) = collecting_sink();
        let token = CancellationToken::new();
        let spec = SubprocessSpec::shell("sh", "echo one; echo two >&2; exit 3");
        let output = run_subprocess(&spec, &sink, &token, POLL).await.unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        let mut seen = lines.lock().clone();
        seen.sort();
        assert_eq!(seen, vec!["one\n", "two\n"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced_and_pipe_drained() {
        let (sink, lines) = collecting_sink();
        let token = CancellationToken::new();
        let spec = SubprocessSpec::shell("sh", "printf 'caf\\351\\n'; seq 1 50000");
        let output = run_subprocess(&spec, &sink, &token, POLL).await.unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert!(output.output.ends_with("\n50000\n"));
        let lines = lines.lock();
        assert_eq!(lines.len(), 50_001);
        assert_eq!(lines[0], "caf\u{FFFD}\n");
        assert_eq!(lines[50_000], "50000\n");
    }

    #[tokio::test]
    async fn test_output_bounded_while_reading() {
        let (sink, lines) = collecting_sink();
        let token = CancellationToken::new();
        let spec = SubprocessSpec::shell("sh", "seq 1 50000").output_limit(1000);
        let output = run_subprocess(&spec, &sink, &token, POLL).await.unwrap();

        assert!(output.success());
        assert!(output.output.len() <= 1000);
        assert!(output.output.ends_with("\n50000\n"));
        assert!(output.truncated_chars > 0);
        // streaming is not affected by the limit
        assert_eq!(lines.lock().len(), 50_000);
    }

    #[tokio::test]
    async fn test_cancel_kills_process_promptly() {
        let (sink, lines) = collecting_sink();
        let token = CancellationToken::new();
        cancel_after(&token, Duration::from_millis(300));

        let spec = SubprocessSpec::shell("sh", "echo 1; sleep 1; echo 2; sleep 1; echo 3");
        let start = Instant::now();
        let err = run_subprocess(&spec, &sink, &token, POLL).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_millis(800));
        assert_eq!(*lines.lock(), vec!["1\n"]);
    }

    #[tokio::test]
    async fn test_pre_cancelled_never_spawns() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let token = CancellationToken::new();
        token.cancel("early");

        let spec = SubprocessSpec::shell("sh", &format!("touch {}", marker.display()));
        let err = run_subprocess(&spec, &ChunkSink::noop(), &token, POLL)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_io_error() {
        let token = CancellationToken::new();
        let spec = SubprocessSpec::new("/definitely/not/a/binary");
        let err = run_subprocess(&spec, &ChunkSink::noop(), &token, POLL)
            .await
            .unwrap_err();
        assert!(matches!(err, RipcordError::Io { .. }));
    }
}
