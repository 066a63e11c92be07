use tauri::AppHandle;
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::engine::SessionStore;
use crate::error::AppError;

pub const PREFERENCES_FILE: &str = "preferences.json";
pub const SESSION_POINTER_KEY: &str = "saved_session_path";

/// Session pointer kept in the `preferences.json` store.
pub struct PreferenceSessionStore {
    app: AppHandle,
}

impl PreferenceSessionStore {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn open(&self) -> Result<std::sync::Arc<tauri_plugin_store::Store<tauri::Wry>>, AppError> {
        self.app.store(PREFERENCES_FILE).map_err(|e| {
            warn!("Failed to open store: {}", e);
            AppError::Config(e.to_string())
        })
    }

    fn save(&self, store: &tauri_plugin_store::Store<tauri::Wry>) -> Result<(), AppError> {
        store.save().map_err(|e| {
            warn!("Failed to save store: {}", e);
            AppError::Config(e.to_string())
        })
    }
}

impl SessionStore for PreferenceSessionStore {
    fn pointer(&self) -> Option<String> {
        let store = self.open().ok()?;
        store
            .get(SESSION_POINTER_KEY)
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .filter(|s| !s.is_empty())
    }

    fn set_pointer(&self, path: &str) -> Result<(), AppError> {
        info!("Saving session pointer: {}", path);
        let store = self.open()?;
        store.set(SESSION_POINTER_KEY, serde_json::json!(path));
        self.save(&store)
    }

    fn clear_pointer(&self) -> Result<(), AppError> {
        info!("Clearing session pointer");
        let store = self.open()?;
        store.delete(SESSION_POINTER_KEY);
        self.save(&store)
    }
}
