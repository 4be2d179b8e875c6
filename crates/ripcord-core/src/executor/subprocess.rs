//! OS subprocess execution with kill-on-cancel
//!
//! The child is started in its own process group (Unix) so cancelling a
//! shell pipeline kills the whole tree, not just the shell.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, warn};

use super::tool::ChunkSink;
use crate::error::{RipcordError, RipcordResult};
use crate::interrupt::CancellationToken;
use crate::utils::TailBuffer;

/// Output kept from a single process unless the spec asks for less
pub const DEFAULT_OUTPUT_LIMIT: usize = 1024 * 1024;

/// What to run
#[derive(Debug, Clone, PartialEq)]
pub struct SubprocessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Bytes of output kept; older output is dropped while reading
    pub output_limit: usize,
}

impl SubprocessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }

    /// `<shell> -c <command>`
    pub fn shell(shell: &str, command: &str) -> Self {
        Self::new(shell).arg("-c").arg(command)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = bytes;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Collected result of a finished process
#[derive(Debug, Clone, PartialEq)]
pub struct SubprocessOutput {
    /// Tail of stdout and stderr lines interleaved in arrival order
    pub output: String,
    /// Characters dropped from the head of `output`
    pub truncated_chars: usize,
    pub exit_code: Option<i32>,
}

impl SubprocessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Kills the process group if the owning future is dropped mid-run
struct ProcessGroupGuard {
    pid: Option<u32>,
}

impl ProcessGroupGuard {
    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_group(pid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // ESRCH: the group already exited
        debug!(pid, "killpg failed: {e}");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// Forcibly stop a cancelled child. Failures are logged and otherwise
/// treated as a completed kill.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_group(pid);
    }
    if let Err(e) = child.kill().await {
        warn!("failed to kill cancelled subprocess, treating it as terminated: {e}");
    }
}

/// Forward every line of `pipe`. Bytes that are not UTF-8 are replaced, so
/// the pipe is always drained to EOF and the child never sees SIGPIPE.
fn forward_lines<R>(pipe: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let mut line = String::from_utf8_lossy(&buf).into_owned();
                    let content_len = line.trim_end_matches(['\r', '\n']).len();
                    line.truncate(content_len);
                    line.push('\n');
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("subprocess pipe read failed: {e}");
                    break;
                }
            }
        }
    });
}

/// Run a process to completion, streaming each output line to `sink`.
///
/// Polls `token` every `poll_interval`; on cancellation the process group is
/// killed and `Cancelled` is returned. Never returns partial output once
/// cancellation has been observed.
#[instrument(skip(sink, token), fields(program = %spec.program))]
pub async fn run_subprocess(
    spec: &SubprocessSpec,
    sink: &ChunkSink,
    token: &CancellationToken,
    poll_interval: Duration,
) -> RipcordResult<SubprocessOutput> {
    token.raise_if_cancelled()?;

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| {
        RipcordError::io(format!("Failed to spawn '{}': {}", spec.program, e))
    })?;
    let mut guard = ProcessGroupGuard { pid: child.id() };
    debug!(pid = ?child.id(), "subprocess started");

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, tx.clone());
    }
    drop(tx);

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut output = TailBuffer::new(spec.output_limit);
    let mut exit_status = None;
    let mut streams_done = false;

    while exit_status.is_none() || !streams_done {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                if token.is_cancelled() {
                    terminate(&mut child).await;
                    guard.disarm();
                    debug!("subprocess killed after cancellation");
                    return Err(token.to_error());
                }
            }
            line = rx.recv(), if !streams_done => match line {
                Some(line) => {
                    sink.emit(&line);
                    output.push(&line);
                }
                None => streams_done = true,
            },
            status = child.wait(), if exit_status.is_none() => {
                exit_status = Some(status.map_err(|e| {
                    RipcordError::io(format!("Failed to wait for '{}': {}", spec.program, e))
                })?);
            }
        }
    }
    guard.disarm();

    if token.is_cancelled() {
        return Err(token.to_error());
    }

    let (output, truncated_chars) = output.finish();
    Ok(SubprocessOutput {
        output,
        truncated_chars,
        exit_code: exit_status.and_then(|s| s.code()),
    })
}
