pub mod engine;
pub mod instagram;
pub mod settings;

mod commands;
mod error;
mod events;
mod preferences;

use std::path::PathBuf;
use std::sync::Arc;

use tauri::{Manager, RunEvent};
use tracing::info;

pub use engine::{AppController, AppSnapshot, Backend, SessionStore, StateObserver};
pub use error::{AppError, ErrorKind};

const APP_DIR_NAME: &str = "instafollows";

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            commands::session::get_snapshot,
            commands::session::restore_session,
            commands::session::load_session,
            commands::session::pick_session_file,
            commands::scan::start_scan,
            commands::scan::unfollow_user,
            commands::scan::refresh_integrity,
            commands::view::set_filter,
            commands::view::set_sort_order,
            commands::view::set_search_query,
            commands::view::dismiss_error,
            commands::view::list_window,
            commands::view::proxy_pic,
        ])
        .setup(|app| {
            let config_dir = app
                .path()
                .app_config_dir()
                .ok()
                .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR_NAME)));
            let data_dir: Option<PathBuf> = app
                .path()
                .app_data_dir()
                .ok()
                .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR_NAME)));

            let settings = settings::resolve_settings(config_dir.as_deref());
            let backend: Arc<dyn Backend> =
                Arc::new(instagram::GhostClient::new(&settings, data_dir)?);
            let store: Arc<dyn SessionStore> =
                Arc::new(preferences::PreferenceSessionStore::new(app.handle().clone()));
            let observer: Arc<dyn StateObserver> =
                Arc::new(events::WindowObserver::new(app.handle().clone()));

            let controller = Arc::new(AppController::new(backend, store, observer));
            app.manage(controller.clone());

            tauri::async_runtime::spawn(async move {
                controller.start().await;
            });
            info!("InstaFollows backend ready");
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|handle, event| {
        if let RunEvent::Exit = event {
            if let Some(controller) = handle.try_state::<Arc<AppController>>() {
                controller.shutdown();
            }
        }
    });
}
