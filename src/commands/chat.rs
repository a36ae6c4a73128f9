use super::AppState;
use crate::db::models::ChatMessage;
use crate::session::{Notice, Reply};
use tauri::State;

#[tauri::command]
pub async fn get_messages(state: State<'_, AppState>) -> Result<Vec<ChatMessage>, String> {
    Ok(state.session.lock().await.messages.clone())
}

#[tauri::command]
pub async fn send_message(
    state: State<'_, AppState>,
    content: String,
    model: Option<String>,
) -> Result<Reply, String> {
    let config = state.config()?;
    let model = model.unwrap_or_else(|| config.default_model().to_string());
    let provider = config.provider(&model).map_err(|e| e.to_string())?;

    let mut session = state.session.lock().await;
    session
        .submit_prompt(&state.db, &provider, &content)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_chat_history(state: State<'_, AppState>) -> Result<Notice, String> {
    let mut session = state.session.lock().await;
    session.delete_history(&state.db).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn start_new_chat(state: State<'_, AppState>) -> Result<Notice, String> {
    let mut session = state.session.lock().await;
    session.start_new_chat(&state.db).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn restore_old_history(state: State<'_, AppState>) -> Result<Notice, String> {
    let mut session = state.session.lock().await;
    session.restore_old_history(&state.db).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn start_recording(state: State<'_, AppState>) -> Result<(), String> {
    state.session.lock().await.start_recording();
    Ok(())
}

/// Finish a voice query: the webview sends the captured audio.
#[tauri::command]
pub async fn stop_recording(
    state: State<'_, AppState>,
    audio: Vec<u8>,
    mime: String,
    model: Option<String>,
) -> Result<Reply, String> {
    let config = state.config()?;
    let transcriber = config.transcriber().map_err(|e| e.to_string())?;
    let model = model.unwrap_or_else(|| config.default_model().to_string());
    let provider = config.provider(&model).map_err(|e| e.to_string())?;

    let mut session = state.session.lock().await;
    session
        .submit_voice(&state.db, &transcriber, &provider, &audio, &mime)
        .await
        .map_err(|e| e.to_string())
}
