//! In-memory renderer for tests and headless runs

use parking_lot::Mutex;

use super::renderer::{PanelStatus, Renderer};

/// One call made on a [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    SpinnerStart(String),
    SpinnerStop,
    PanelOpen(String),
    PanelRedraw {
        title: String,
        body: String,
        status: PanelStatus,
    },
    PanelClose {
        erase: bool,
    },
    Announce(String),
}

#[derive(Default)]
struct Recorded {
    calls: Vec<RenderCall>,
    spinner_active: bool,
    panel_active: bool,
}

/// Records every call instead of drawing
#[derive(Default)]
pub struct RecordingRenderer {
    recorded: Mutex<Recorded>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.recorded.lock().calls.clone()
    }

    pub fn redraw_count(&self) -> usize {
        self.recorded
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, RenderCall::PanelRedraw { .. }))
            .count()
    }

    /// Body of the most recent redraw
    pub fn last_body(&self) -> Option<String> {
        self.recorded.lock().calls.iter().rev().find_map(|c| match c {
            RenderCall::PanelRedraw { body, .. } => Some(body.clone()),
            _ => None,
        })
    }

    pub fn last_status(&self) -> Option<PanelStatus> {
        self.recorded.lock().calls.iter().rev().find_map(|c| match c {
            RenderCall::PanelRedraw { status, .. } => Some(*status),
            _ => None,
        })
    }

    pub fn announcements(&self) -> Vec<String> {
        self.recorded
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::Announce(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn spinner_active(&self) -> bool {
        self.recorded.lock().spinner_active
    }

    pub fn panel_active(&self) -> bool {
        self.recorded.lock().panel_active
    }

    fn record(&self, call: RenderCall) {
        let mut recorded = self.recorded.lock();
        match &call {
            RenderCall::SpinnerStart(_) => recorded.spinner_active = true,
            RenderCall::SpinnerStop => recorded.spinner_active = false,
            RenderCall::PanelOpen(_) | RenderCall::PanelRedraw { .. } => {
                recorded.panel_active = true
            }
            RenderCall::PanelClose { .. } => recorded.panel_active = false,
            RenderCall::Announce(_) => {}
        }
        recorded.calls.push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn spinner_start(&self, message: &str) {
        self.record(RenderCall::SpinnerStart(message.to_string()));
    }

    fn spinner_stop(&self) {
        self.record(RenderCall::SpinnerStop);
    }

    fn panel_open(&self, title: &str) {
        self.record(RenderCall::PanelOpen(title.to_string()));
    }

    fn panel_redraw(&self, title: &str, body: &str, status: PanelStatus) {
        self.record(RenderCall::PanelRedraw {
            title: title.to_string(),
            body: body.to_string(),
            status,
        });
    }

    fn panel_close(&self, erase: bool) {
        self.record(RenderCall::PanelClose { erase });
    }

    fn announce(&self, message: &str) {
        self.record(RenderCall::Announce(message.to_string()));
    }
}
