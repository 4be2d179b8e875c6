//! Reactive renderer state machine
//!
//! Follows `AGENT_STATE_CHANGED`: a spinner while thinking, a live output
//! panel while a tool runs. Tool output chunks are only appended on arrival;
//! a background refresh task drains them and redraws at most once per
//! refresh interval, so redraw cost does not depend on how fast a command
//! prints.
//!
//! Every transition runs under one mutex, stopping the old visual and
//! starting the new one as a single step.

use anyhow::Context;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken as TaskToken;
use tracing::{debug, trace, warn};

use super::renderer::{PanelStatus, Renderer};
use crate::agent::AgentState;
use crate::events::{Event, EventBus, EventType};
use crate::utils::TailBuffer;

pub const THINKING_MESSAGE: &str = "Thinking";

/// Tool output kept for the live panel. Older output is dropped.
pub const PANEL_BUFFER_BYTES: usize = 64 * 1024;

/// What the manager currently has on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveVisual {
    None,
    Spinner,
    LivePanel,
}

/// What was on screen when `pause()` was called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PausedSnapshot {
    pub spinner_active: bool,
    pub live_active: bool,
    pub buffered_text: TailBuffer,
}

impl PausedSnapshot {
    fn new(spinner_active: bool, live_active: bool, buffered_text: TailBuffer) -> Self {
        Self {
            spinner_active,
            live_active,
            buffered_text,
        }
    }
}

struct RefreshTask {
    cancel: TaskToken,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Lives from the first THINKING/USING_TOOL transition until IDLE
struct RendererState {
    active_visual: ActiveVisual,
    pending_chunks: TailBuffer,
    tool_output_buffer: TailBuffer,
    title: String,
    status: PanelStatus,
    paused_snapshot: Option<PausedSnapshot>,
    refresh: Option<RefreshTask>,
}

impl RendererState {
    fn new() -> Self {
        Self {
            active_visual: ActiveVisual::None,
            pending_chunks: TailBuffer::new(PANEL_BUFFER_BYTES),
            tool_output_buffer: TailBuffer::new(PANEL_BUFFER_BYTES),
            title: String::new(),
            status: PanelStatus::Running,
            paused_snapshot: None,
            refresh: None,
        }
    }

    /// Move pending chunks into the buffer. False when there was nothing.
    fn flush_pending(&mut self) -> bool {
        if self.pending_chunks.is_empty() {
            return false;
        }
        self.tool_output_buffer.push(self.pending_chunks.as_str());
        self.pending_chunks.clear();
        true
    }

    /// Whether a tool panel is showing, or would be after resume
    fn in_tool_panel(&self, paused: bool) -> bool {
        if paused {
            self.paused_snapshot.as_ref().is_some_and(|s| s.live_active)
        } else {
            self.active_visual == ActiveVisual::LivePanel
        }
    }
}

#[derive(Default)]
struct ManagerState {
    current: Option<RendererState>,
    paused: bool,
    announcements_suppressed: bool,
    selected_tool: Option<String>,
}

struct ManagerInner {
    renderer: Arc<dyn Renderer>,
    refresh_interval: Duration,
    state: Mutex<ManagerState>,
}

impl ManagerInner {
    fn stop_visuals(&self, rs: &mut RendererState, erase_panel: bool) {
        if let Some(task) = rs.refresh.take() {
            task.stop();
        }
        match std::mem::replace(&mut rs.active_visual, ActiveVisual::None) {
            ActiveVisual::Spinner => self.renderer.spinner_stop(),
            ActiveVisual::LivePanel => self.renderer.panel_close(erase_panel),
            ActiveVisual::None => {}
        }
    }

    fn refresh_tick(&self, cancel: &TaskToken) {
        let mut st = self.state.lock();
        // Checked under the lock: `stop()` also runs under it.
        if cancel.is_cancelled() || st.paused {
            return;
        }
        let Some(rs) = st.current.as_mut() else {
            return;
        };
        if rs.active_visual == ActiveVisual::LivePanel && rs.flush_pending() {
            self.renderer
                .panel_redraw(&rs.title, rs.tool_output_buffer.as_str(), rs.status);
        }
    }
}

/// Reactive renderer driven by bus events
#[derive(Clone)]
pub struct InterfaceManager {
    inner: Arc<ManagerInner>,
}

impl InterfaceManager {
    pub fn new(renderer: Arc<dyn Renderer>, refresh_interval: Duration) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                renderer,
                refresh_interval,
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    /// Subscribe to the events the manager renders
    pub fn attach(&self, bus: &EventBus) {
        for event_type in [
            EventType::AgentStateChanged,
            EventType::ToolSelected,
            EventType::ToolOutputChunk,
            EventType::ToolCompleted,
            EventType::ToolError,
            EventType::ExecutionCancelled,
        ] {
            let manager = self.clone();
            bus.subscribe(event_type, move |event| manager.handle_event(event));
        }
    }

    pub fn handle_event(&self, event: &Event) -> anyhow::Result<()> {
        match event.event_type() {
            EventType::AgentStateChanged => {
                let state = event
                    .agent_state()
                    .context("AGENT_STATE_CHANGED without a valid state")?;
                self.on_state_changed(state, event.get_str("tool"));
            }
            EventType::ToolSelected => {
                self.on_tool_selected(event.get_str("tool").unwrap_or("tool"));
            }
            EventType::ToolOutputChunk => {
                if let Some(text) = event.get_str("text") {
                    self.on_chunk(text);
                }
            }
            EventType::ToolCompleted => {
                let status = if event.get_bool("success").unwrap_or(false) {
                    PanelStatus::Succeeded
                } else {
                    PanelStatus::Failed
                };
                self.on_tool_finished(status);
            }
            EventType::ToolError => self.on_tool_finished(PanelStatus::Failed),
            EventType::ExecutionCancelled => self.on_tool_finished(PanelStatus::Cancelled),
            other => trace!(event = %other, "not rendered"),
        }
        Ok(())
    }

    fn on_state_changed(&self, state: AgentState, tool: Option<&str>) {
        let mut st = self.inner.state.lock();
        debug!(%state, paused = st.paused, "render transition");
        match state {
            AgentState::Idle => {
                if let Some(mut rs) = st.current.take() {
                    self.inner.stop_visuals(&mut rs, false);
                }
                st.selected_tool = None;
            }
            AgentState::Thinking => {
                let paused = st.paused;
                let rs = st.current.get_or_insert_with(RendererState::new);
                self.inner.stop_visuals(rs, false);
                rs.pending_chunks.clear();
                rs.tool_output_buffer.clear();
                rs.status = PanelStatus::Running;
                if paused {
                    rs.paused_snapshot = Some(PausedSnapshot::new(
                        true,
                        false,
                        TailBuffer::new(PANEL_BUFFER_BYTES),
                    ));
                } else {
                    self.inner.renderer.spinner_start(THINKING_MESSAGE);
                    rs.active_visual = ActiveVisual::Spinner;
                }
            }
            AgentState::UsingTool => {
                let title = tool
                    .map(str::to_string)
                    .or_else(|| st.selected_tool.clone())
                    .unwrap_or_else(|| "tool".to_string());
                let paused = st.paused;
                let rs = st.current.get_or_insert_with(RendererState::new);
                self.inner.stop_visuals(rs, false);
                rs.pending_chunks.clear();
                rs.tool_output_buffer.clear();
                rs.title = title;
                rs.status = PanelStatus::Running;
                if paused {
                    rs.paused_snapshot = Some(PausedSnapshot::new(
                        false,
                        true,
                        TailBuffer::new(PANEL_BUFFER_BYTES),
                    ));
                } else {
                    self.open_panel(rs);
                }
            }
        }
    }

    fn on_tool_selected(&self, tool: &str) {
        let mut st = self.inner.state.lock();
        st.selected_tool = Some(tool.to_string());
        if !st.paused && !st.announcements_suppressed {
            self.inner.renderer.announce(&format!("● {tool}"));
        }
    }

    fn on_chunk(&self, text: &str) {
        let mut st = self.inner.state.lock();
        let paused = st.paused;
        let Some(rs) = st.current.as_mut() else {
            trace!("chunk outside a query dropped");
            return;
        };
        if rs.status.is_finished() || !rs.in_tool_panel(paused) {
            return;
        }
        if paused {
            if let Some(snapshot) = rs.paused_snapshot.as_mut() {
                snapshot.buffered_text.push(text);
            }
        } else {
            rs.pending_chunks.push(text);
        }
    }

    fn on_tool_finished(&self, status: PanelStatus) {
        let mut st = self.inner.state.lock();
        let paused = st.paused;
        let Some(rs) = st.current.as_mut() else {
            return;
        };
        if rs.status.is_finished() || !rs.in_tool_panel(paused) {
            return;
        }
        rs.status = status;
        if let Some(task) = rs.refresh.take() {
            task.stop();
        }
        // While paused the snapshot already holds everything; resume draws
        // the final status.
        if !paused {
            rs.flush_pending();
            self.inner
                .renderer
                .panel_redraw(&rs.title, rs.tool_output_buffer.as_str(), status);
        }
    }

    fn open_panel(&self, rs: &mut RendererState) {
        self.inner.renderer.panel_open(&rs.title);
        if !rs.tool_output_buffer.is_empty() {
            self.inner
                .renderer
                .panel_redraw(&rs.title, rs.tool_output_buffer.as_str(), rs.status);
        }
        rs.active_visual = ActiveVisual::LivePanel;
        if !rs.status.is_finished() {
            rs.refresh = self.spawn_refresh();
        }
    }

    fn spawn_refresh(&self) -> Option<RefreshTask> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, live panel will only redraw on completion");
            return None;
        };
        let cancel = TaskToken::new();
        let task_cancel = cancel.clone();
        let inner: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let period = self.inner.refresh_interval;

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else { break };
                        inner.refresh_tick(&task_cancel);
                    }
                }
            }
        });
        Some(RefreshTask { cancel, handle })
    }

    /// Stop all visuals and remember what was showing. Repeated calls are
    /// no-ops.
    pub fn pause(&self) {
        let mut st = self.inner.state.lock();
        if st.paused {
            return;
        }
        st.paused = true;
        if let Some(rs) = st.current.as_mut() {
            rs.flush_pending();
            let snapshot = PausedSnapshot::new(
                rs.active_visual == ActiveVisual::Spinner,
                rs.active_visual == ActiveVisual::LivePanel,
                rs.tool_output_buffer.clone(),
            );
            self.inner.stop_visuals(rs, true);
            rs.paused_snapshot = Some(snapshot);
        }
        debug!("interface paused");
    }

    /// Bring back what `pause()` stopped. Without a prior pause this does
    /// nothing.
    pub fn resume(&self) {
        let mut st = self.inner.state.lock();
        if !st.paused {
            return;
        }
        st.paused = false;
        debug!("interface resumed");
        let Some(rs) = st.current.as_mut() else {
            return;
        };
        let Some(snapshot) = rs.paused_snapshot.take() else {
            return;
        };
        if snapshot.live_active {
            rs.tool_output_buffer = snapshot.buffered_text;
            self.open_panel(rs);
        } else if snapshot.spinner_active {
            self.inner.renderer.spinner_start(THINKING_MESSAGE);
            rs.active_visual = ActiveVisual::Spinner;
        }
    }

    /// Erase whatever is showing and drop the render state
    pub fn clear(&self) {
        let mut st = self.inner.state.lock();
        if let Some(mut rs) = st.current.take() {
            self.inner.stop_visuals(&mut rs, true);
        }
        st.selected_tool = None;
    }

    pub fn set_announcements_suppressed(&self, suppressed: bool) {
        self.inner.state.lock().announcements_suppressed = suppressed;
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    pub fn active_visual(&self) -> ActiveVisual {
        self.inner
            .state
            .lock()
            .current
            .as_ref()
            .map_or(ActiveVisual::None, |rs| rs.active_visual)
    }

    pub fn refresh_running(&self) -> bool {
        self.inner
            .state
            .lock()
            .current
            .as_ref()
            .and_then(|rs| rs.refresh.as_ref())
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Tool output received so far, including chunks not yet drawn
    pub fn buffered_text(&self) -> String {
        let st = self.inner.state.lock();
        let Some(rs) = st.current.as_ref() else {
            return String::new();
        };
        if let Some(snapshot) = rs.paused_snapshot.as_ref().filter(|_| st.paused) {
            return snapshot.buffered_text.as_str().to_string();
        }
        let mut text = rs.tool_output_buffer.clone();
        text.push(rs.pending_chunks.as_str());
        text.as_str().to_string()
    }

    /// True when the manager holds no render state at all
    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().current.is_none()
    }
}
