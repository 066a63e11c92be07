use std::sync::Arc;

use tauri::State;

use crate::engine::presenter::Viewport;
use crate::engine::{AppController, AppSnapshot, Filter, ListWindow, SortOrder};

#[tauri::command]
pub fn set_filter(controller: State<'_, Arc<AppController>>, filter: Filter) -> AppSnapshot {
    controller.set_filter(filter);
    controller.snapshot()
}

#[tauri::command]
pub fn set_sort_order(controller: State<'_, Arc<AppController>>, sort_order: SortOrder) -> AppSnapshot {
    controller.set_sort_order(sort_order);
    controller.snapshot()
}

#[tauri::command]
pub fn set_search_query(controller: State<'_, Arc<AppController>>, query: String) -> AppSnapshot {
    controller.set_search_query(&query);
    controller.snapshot()
}

#[tauri::command]
pub fn dismiss_error(controller: State<'_, Arc<AppController>>) -> AppSnapshot {
    controller.dismiss_error();
    controller.snapshot()
}

#[tauri::command]
pub fn list_window(controller: State<'_, Arc<AppController>>, viewport: Viewport) -> ListWindow {
    controller.list_window(viewport)
}

/// Avatar as an inline data URL, or the initials placeholder.
#[tauri::command]
pub async fn proxy_pic(
    controller: State<'_, Arc<AppController>>,
    url: String,
    username: String,
) -> Result<String, String> {
    Ok(controller.avatar(&url, &username).await)
}
