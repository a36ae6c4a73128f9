pub mod config;
pub mod db;
pub mod doc_processor;
pub mod llm;
pub mod ocr;
pub mod session;
pub mod speech;

#[cfg(feature = "desktop")]
mod commands;

use tracing_subscriber::EnvFilter;

/// Install the global log subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use commands::{chat, documents, settings, AppState};
    use tauri::Manager;

    init_tracing();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let app_dir = app.path().app_data_dir()?;
            let database = db::Database::new(&app_dir)?;
            let session = session::Session::load(&database)?;
            tracing::info!(messages = session.messages.len(), "session restored");
            app.manage(AppState::new(database, session));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            documents::supported_extensions,
            documents::process_documents,
            documents::process_files,
            chat::get_messages,
            chat::send_message,
            chat::delete_chat_history,
            chat::start_new_chat,
            chat::restore_old_history,
            chat::start_recording,
            chat::stop_recording,
            settings::get_settings,
            settings::set_setting,
            settings::delete_setting,
            settings::get_available_models,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
