use std::path::PathBuf;

use serde::Deserialize;
use tauri::State;

use fosika_desktop::{
    error::AppError, export::write_reports_csv, pipeline::ViewKind, state::AppState,
    storage::NoteStore,
};

use super::require_any;

#[derive(Debug, Deserialize)]
pub struct ExportReportsPayload {
    pub view: ViewKind,
    pub destination: String,
}

/// Exports every report matching the view's filters, in its sort order, to CSV.
#[tauri::command]
pub fn export_reports(
    state: State<AppState>,
    payload: ExportReportsPayload,
) -> Result<usize, String> {
    require_any(&state.gate, &["reports.export"])?;
    let reports = state
        .board(payload.view)
        .selection()
        .map_err(AppError::from)?;
    let notes = state.store.load_notes().map_err(AppError::from)?;
    let destination = PathBuf::from(payload.destination);
    Ok(write_reports_csv(&reports, &notes, &destination).map_err(AppError::from)?)
}
