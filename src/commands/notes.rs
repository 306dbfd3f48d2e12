use std::collections::HashMap;

use serde::Deserialize;
use tauri::State;

use fosika_desktop::{
    error::AppError,
    models::ReportNote,
    state::AppState,
    storage::{self, NoteStore},
};

#[tauri::command]
pub fn list_notes(state: State<AppState>) -> Result<HashMap<i64, ReportNote>, String> {
    Ok(state.store.load_notes().map_err(AppError::from)?)
}

#[derive(Debug, Deserialize)]
pub struct SaveNotePayload {
    #[serde(rename = "reportId")]
    pub report_id: i64,
    pub memo: String,
}

/// Saves a local memo for a report; an empty memo clears it.
#[tauri::command]
pub fn save_note(
    state: State<AppState>,
    payload: SaveNotePayload,
) -> Result<Option<ReportNote>, String> {
    Ok(storage::save_note(&*state.store, payload.report_id, &payload.memo)
        .map_err(AppError::from)?)
}
