use super::AppState;
use crate::doc_processor::UploadedDocument;
use crate::session::ProcessReport;
use std::path::Path;
use tauri::State;

/// Suffixes offered in the file picker.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md", "jpeg", "jpg", "png"];

#[tauri::command]
pub fn supported_extensions() -> Vec<&'static str> {
    SUPPORTED_EXTENSIONS.to_vec()
}

/// Process files dropped or uploaded in the webview.
#[tauri::command]
pub async fn process_documents(
    state: State<'_, AppState>,
    uploads: Vec<UploadedDocument>,
) -> Result<ProcessReport, String> {
    let ocr = state.config()?.ocr();
    let mut session = state.session.lock().await;
    session
        .process_documents(&state.db, &ocr, &uploads)
        .await
        .map_err(|e| e.to_string())
}

/// Process files picked through the native dialog.
#[tauri::command]
pub async fn process_files(
    state: State<'_, AppState>,
    file_paths: Vec<String>,
) -> Result<ProcessReport, String> {
    let uploads = file_paths
        .iter()
        .map(|p| UploadedDocument::from_path(Path::new(p)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    process_documents(state, uploads).await
}
