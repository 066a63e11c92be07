use std::sync::Arc;

use tauri::{AppHandle, State};
use tauri_plugin_dialog::DialogExt;
use tracing::info;

use crate::engine::{AppController, AppSnapshot, AppStatus};

#[tauri::command]
pub fn get_snapshot(controller: State<'_, Arc<AppController>>) -> AppSnapshot {
    controller.snapshot()
}

#[tauri::command]
pub async fn restore_session(controller: State<'_, Arc<AppController>>) -> Result<AppStatus, String> {
    info!("Restoring saved session");
    Ok(controller.restore().await?)
}

#[tauri::command]
pub async fn load_session(
    controller: State<'_, Arc<AppController>>,
    path: String,
) -> Result<AppStatus, String> {
    info!("Loading session file: {}", path);
    Ok(controller.load_session(&path).await?)
}

/// Ask for a cookie export and load it. `Ok(None)` when the dialog was cancelled.
#[tauri::command]
pub async fn pick_session_file(
    app: AppHandle,
    controller: State<'_, Arc<AppController>>,
) -> Result<Option<AppStatus>, String> {
    let picked = app
        .dialog()
        .file()
        .set_title("Select cookies.json")
        .add_filter("Cookie export", &["json"])
        .blocking_pick_file();

    let Some(file) = picked else {
        info!("Session file selection cancelled");
        return Ok(None);
    };
    let path = file.into_path().map_err(|e| e.to_string())?;
    let path = path.to_string_lossy().to_string();
    info!("Session file selected: {}", path);
    Ok(Some(controller.load_session(&path).await?))
}
