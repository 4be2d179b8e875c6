//! Application wiring and the interactive loop

use anyhow::Context;
use ripcord_core::config::RuntimeConfig;
use ripcord_core::error::RipcordError;
use ripcord_core::executor::{LlmExecutor, ToolCallExecutor};
use ripcord_core::input::{
    InputState, PermissionBehavior, PermissionGate, StaticPermissionPolicy, UserPrompt,
};
use ripcord_core::interrupt::{ExecutionSession, SIGINT_REASON, USER_INTERRUPT_REASON};
use ripcord_core::monitor::{CrosstermKeySource, KeyMonitor, KeyMonitorHandle};
use ripcord_core::tools::ShellTool;
use ripcord_core::ui::{InterfaceManager, TerminalRenderer, UiCoordinator};
use ripcord_core::{Event, EventBus, QueryOutcome, QueryRunner};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::console::CliConsole;
use crate::demo_llm::DemoLlm;
use crate::prompt::TerminalPrompt;
use crate::signal_handler::{AppState, SignalHandler};

const PROMPT: &str = "ripcord>";
const DEMO_LATENCY: Duration = Duration::from_millis(600);

/// What came back from the prompt
enum LineInput {
    Query(String),
    /// The interrupt key abandoned the line
    Abandoned,
    Exit,
}

pub struct App {
    config: RuntimeConfig,
    console: CliConsole,
    bus: EventBus,
    session: Arc<ExecutionSession>,
    input: InputState,
    prompt: Arc<TerminalPrompt>,
    runner: QueryRunner,
    signals: SignalHandler,
    monitor: Option<KeyMonitorHandle>,
}

impl App {
    pub fn new(config: RuntimeConfig, auto_approve: bool, verbose: bool) -> Self {
        let bus = EventBus::new();
        let session = Arc::new(ExecutionSession::new());
        let input = InputState::new();

        let manager = InterfaceManager::new(
            Arc::new(TerminalRenderer::new()),
            config.refresh_interval(),
        );
        manager.attach(&bus);
        UiCoordinator::new(manager).attach(&bus);

        let prompt = Arc::new(TerminalPrompt::new());
        let policy = if auto_approve {
            StaticPermissionPolicy::allow_all()
        } else {
            StaticPermissionPolicy::new(PermissionBehavior::Allow)
                .with_tool("shell", PermissionBehavior::Ask)
        };
        let gate = PermissionGate::new(
            bus.clone(),
            input.clone(),
            prompt.clone() as Arc<dyn UserPrompt>,
            Arc::new(policy),
        );

        let poll = config.poll_interval();
        let tools = ToolCallExecutor::new(poll)
            .with_tool(Arc::new(ShellTool::new(config.shell.clone(), poll)));
        let runner = QueryRunner::new(
            bus.clone(),
            session.clone(),
            LlmExecutor::new(Arc::new(DemoLlm::new(DEMO_LATENCY)), poll),
            tools,
            Arc::new(gate),
        )
        .with_max_steps(config.max_steps);

        Self {
            config,
            console: CliConsole::new(verbose),
            bus,
            session,
            input,
            prompt,
            runner,
            signals: SignalHandler::new(),
            monitor: None,
        }
    }

    /// Install the SIGINT handler and the interrupt key monitor. Neither is
    /// required: without them queries simply cannot be cancelled that way.
    pub fn start(&mut self) -> anyhow::Result<()> {
        self.signals
            .start(self.session.clone())
            .context("failed to install SIGINT handler")?;

        let monitor = KeyMonitor::new(
            CrosstermKeySource::new(),
            self.config.interrupt_key,
            self.session.clone(),
            self.input.clone(),
        )
        .start();
        match monitor {
            Ok(handle) => {
                self.monitor = Some(handle);
                self.console.info(&format!(
                    "press {} to cancel a running query",
                    self.config.interrupt_key
                ));
            }
            Err(_) => self
                .console
                .warn("interrupt key unavailable, press Ctrl+C to cancel instead"),
        }
        Ok(())
    }

    /// Run a single query and report it. Failed queries become an error so
    /// the process exits non-zero.
    pub async fn run_once(&self, query: &str) -> anyhow::Result<()> {
        match self.run_query(query).await {
            QueryOutcome::Failed { message } => Err(anyhow::anyhow!(message)),
            _ => Ok(()),
        }
    }

    pub async fn run_interactive(&self) -> anyhow::Result<()> {
        self.console.print_header("Ripcord");
        self.console.hint(&format!(
            "Type a message, `!command` to run a shell command, or `exit` to quit. \
             Press {} to cancel.",
            self.config.interrupt_key
        ));

        loop {
            match self.read_line().await? {
                LineInput::Exit => break,
                LineInput::Abandoned => {
                    self.bus.emit(Event::user_input_paused()).await;
                    self.bus.emit(Event::user_input_resumed()).await;
                }
                LineInput::Query(query) => {
                    let query = query.trim();
                    if query.is_empty() {
                        continue;
                    }
                    if matches!(query, "exit" | "quit") {
                        break;
                    }
                    if query == "clear" {
                        self.runner.clear_history();
                        self.console.success("conversation cleared");
                        continue;
                    }
                    self.run_query(query).await;
                }
            }
        }

        self.console.hint("Goodbye!");
        Ok(())
    }

    async fn read_line(&self) -> anyhow::Result<LineInput> {
        let prompt = self.prompt.clone();
        let input = self.input.clone();
        let line = tokio::task::spawn_blocking(move || {
            let _guard = input.enter_prompt();
            prompt.prompt_user(PROMPT)
        })
        .await
        .context("prompt task failed")?;

        match line {
            Ok(line) => Ok(LineInput::Query(line)),
            Err(RipcordError::Cancelled { reason }) if reason == USER_INTERRUPT_REASON => {
                Ok(LineInput::Abandoned)
            }
            Err(RipcordError::Cancelled { reason }) if reason == SIGINT_REASON => {
                Ok(LineInput::Exit)
            }
            Err(e) => Err(e).context("failed to read input"),
        }
    }

    async fn run_query(&self, query: &str) -> QueryOutcome {
        info!(query_len = query.len(), "running query");
        self.signals.set_app_state(AppState::ExecutingTask);
        let outcome = self.runner.run_query(query).await;
        self.signals.set_app_state(AppState::WaitingForInput);
        debug!(?outcome, "query finished");

        match &outcome {
            QueryOutcome::Completed { response } => {
                if !response.is_empty() {
                    self.console.print_block(response);
                }
                self.console.success("done");
            }
            QueryOutcome::Cancelled { .. } => self.console.cancelled("operation cancelled"),
            QueryOutcome::Failed { message } => self.console.error(message),
        }
        outcome
    }
}
