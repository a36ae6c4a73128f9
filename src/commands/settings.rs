use super::AppState;
use crate::config::{self, SETTING_KEYS};
use crate::llm::ModelInfo;
use std::collections::HashMap;
use tauri::State;

#[tauri::command]
pub fn get_settings(state: State<'_, AppState>) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for key in SETTING_KEYS {
        if let Some(value) = state.db.get_setting(key).map_err(|e| e.to_string())? {
            map.insert(key.to_string(), config::mask(key, &value));
        }
    }
    Ok(map)
}

#[tauri::command]
pub fn set_setting(state: State<'_, AppState>, key: String, value: String) -> Result<(), String> {
    config::check_key(&key).map_err(|e| e.to_string())?;
    state.db.set_setting(&key, &value).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn delete_setting(state: State<'_, AppState>, key: String) -> Result<(), String> {
    config::check_key(&key).map_err(|e| e.to_string())?;
    state.db.delete_setting(&key).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_available_models(state: State<'_, AppState>) -> Result<Vec<ModelInfo>, String> {
    Ok(state.config()?.available_models())
}
