use tauri::{AppHandle, Emitter};
use tracing::warn;

use crate::engine::{AppSnapshot, ScanProgress, StateObserver};

pub const APP_STATE_EVENT: &str = "app_state";
pub const SCAN_PROGRESS_EVENT: &str = "scan_progress";

/// Forwards controller notifications to the webview as events.
pub struct WindowObserver {
    app: AppHandle,
}

impl WindowObserver {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl StateObserver for WindowObserver {
    fn on_state(&self, snapshot: &AppSnapshot) {
        if let Err(e) = self.app.emit(APP_STATE_EVENT, snapshot) {
            warn!("Failed to emit {}: {}", APP_STATE_EVENT, e);
        }
    }

    fn on_progress(&self, progress: &ScanProgress) {
        if let Err(e) = self.app.emit(SCAN_PROGRESS_EVENT, progress) {
            warn!("Failed to emit {}: {}", SCAN_PROGRESS_EVENT, e);
        }
    }
}
