//! Application state management

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use lq_launcher::LifecycleCoordinator;

use crate::shell::TauriShell;

/// Application state shared between the init task and window events.
///
/// The coordinator slot is populated once startup has run; the cancel
/// token is stashed separately so a close request can abort a startup
/// still in flight without waiting for the coordinator lock.
pub struct AppState {
    pub coordinator: Arc<Mutex<Option<LifecycleCoordinator<TauriShell>>>>,
    cancel: std::sync::Mutex<Option<CancellationToken>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(None)),
            cancel: std::sync::Mutex::new(None),
        }
    }

    pub fn set_cancel(&self, token: CancellationToken) {
        if let Ok(mut slot) = self.cancel.lock() {
            *slot = Some(token);
        }
    }

    pub fn cancel_token(&self) -> Option<CancellationToken> {
        self.cancel.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
