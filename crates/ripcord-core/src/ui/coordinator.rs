//! REACTIVE / INTERACTIVE mode switching
//!
//! Permission prompts read the terminal synchronously, so while one is open
//! the interface manager is paused and its announcements are muted. Only one
//! permission request can be outstanding; the permission gate serialises
//! them, and a request that arrives while already interactive is ignored
//! here.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use super::interface_manager::InterfaceManager;
use crate::events::{EventBus, EventType};

/// Who owns the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// The interface manager redraws on its own
    #[default]
    Reactive,
    /// A synchronous prompt owns the terminal
    Interactive,
}

#[derive(Clone)]
pub struct UiCoordinator {
    manager: InterfaceManager,
    mode: Arc<Mutex<UiMode>>,
}

impl UiCoordinator {
    pub fn new(manager: InterfaceManager) -> Self {
        Self {
            manager,
            mode: Arc::new(Mutex::new(UiMode::Reactive)),
        }
    }

    pub fn mode(&self) -> UiMode {
        *self.mode.lock()
    }

    pub fn manager(&self) -> &InterfaceManager {
        &self.manager
    }

    pub fn attach(&self, bus: &EventBus) {
        let coordinator = self.clone();
        bus.subscribe(EventType::PermissionRequested, move |_| {
            coordinator.enter_interactive();
            Ok(())
        });

        let coordinator = self.clone();
        bus.subscribe(EventType::PermissionResolved, move |_| {
            coordinator.enter_reactive();
            Ok(())
        });

        let coordinator = self.clone();
        bus.subscribe(EventType::UserInputPaused, move |_| {
            coordinator.on_user_input_paused();
            Ok(())
        });
    }

    /// Hand the terminal to a synchronous prompt
    pub fn enter_interactive(&self) {
        let mut mode = self.mode.lock();
        if *mode == UiMode::Interactive {
            warn!("permission requested while another prompt is open, ignoring");
            return;
        }
        *mode = UiMode::Interactive;
        self.manager.pause();
        self.manager.set_announcements_suppressed(true);
        debug!("ui mode: interactive");
    }

    /// Give the terminal back to the interface manager
    pub fn enter_reactive(&self) {
        let mut mode = self.mode.lock();
        if *mode == UiMode::Reactive {
            debug!("permission resolved without an open request");
            return;
        }
        *mode = UiMode::Reactive;
        self.manager.set_announcements_suppressed(false);
        self.manager.resume();
        debug!("ui mode: reactive");
    }

    /// The interrupt key was pressed while typing. The query is gone too, so
    /// only the visuals are cleared; the mode stays as it is.
    pub fn on_user_input_paused(&self) {
        self.manager.clear();
    }
}
