//! Terminal user interface
//!
//! [`InterfaceManager`] renders agent progress reactively, [`UiCoordinator`]
//! decides when it may write to the screen, and [`Renderer`] is the actual
//! screen writer.

mod coordinator;
mod interface_manager;
mod recording;
mod renderer;

pub use coordinator::{UiCoordinator, UiMode};
pub use interface_manager::{
    ActiveVisual, InterfaceManager, PANEL_BUFFER_BYTES, PausedSnapshot, THINKING_MESSAGE,
};
pub use recording::{RecordingRenderer, RenderCall};
pub use renderer::{DEFAULT_PANEL_LINES, PanelStatus, Renderer, TerminalRenderer};
