use std::sync::Arc;

use tauri::State;
use tracing::info;

use crate::engine::results::ScanStats;
use crate::engine::AppController;

#[tauri::command]
pub async fn start_scan(
    controller: State<'_, Arc<AppController>>,
    target_username: Option<String>,
) -> Result<ScanStats, String> {
    let target = target_username.filter(|t| !t.trim().is_empty());
    info!("Scan requested for {}", target.as_deref().unwrap_or("current session"));
    Ok(controller.start_scan(target).await?)
}

#[tauri::command]
pub async fn unfollow_user(
    controller: State<'_, Arc<AppController>>,
    profile_id: String,
) -> Result<bool, String> {
    info!("Unfollow requested for {}", profile_id);
    Ok(controller.unfollow(&profile_id).await?)
}

/// Re-read integrity now instead of waiting for the next poll.
#[tauri::command]
pub async fn refresh_integrity(controller: State<'_, Arc<AppController>>) -> Result<u8, String> {
    controller.refresh_integrity().await;
    Ok(controller.snapshot().integrity)
}
