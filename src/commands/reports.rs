use serde::{Deserialize, Serialize};
use tauri::State;
use tracing::info;

use fosika_desktop::{
    board::{FetchState, RefreshOutcome},
    error::AppError,
    models::{Report, ReportEdit, ReportStatus},
    notice::Notice,
    pipeline::{ListPage, ListQuery, ListUpdate, ViewKind},
    state::AppState,
    storage::NoteStore,
};

use super::require_any;

const MANAGE_TOKENS: [&str; 2] = ["reports.manage", "investigations.manage"];

#[derive(Debug, Deserialize)]
pub struct ViewPayload {
    pub view: ViewKind,
}

#[derive(Debug, Serialize)]
pub struct LoadReportsResponse {
    pub fetch: FetchState,
    /// False when a newer fetch superseded this one.
    pub applied: bool,
    pub page: Option<ListPage>,
}

fn page_with_notes(state: &AppState, mut page: ListPage) -> Result<ListPage, AppError> {
    let notes = state.store.load_notes()?;
    page.attach_notes(&notes);
    Ok(page)
}

/// Fetches the whole collection for a view and returns its current page.
#[tauri::command]
pub async fn load_reports(
    state: State<'_, AppState>,
    payload: ViewPayload,
) -> Result<LoadReportsResponse, String> {
    require_any(&state.gate, &["reports.view"])?;
    let board = state.board(payload.view);
    let outcome = board
        .refresh(state.api())
        .await
        .map_err(AppError::from)?;
    let applied = matches!(outcome, RefreshOutcome::Applied(_));
    let page = if board.is_loaded() {
        Some(page_with_notes(&state, board.current_page().map_err(AppError::from)?)?)
    } else {
        None
    };
    Ok(LoadReportsResponse {
        fetch: board.fetch_state(),
        applied,
        page,
    })
}

#[derive(Debug, Deserialize)]
pub struct UpdateListPayload {
    pub view: ViewKind,
    pub update: ListUpdate,
}

/// Applies one filter, sort or paging change to a view.
#[tauri::command]
pub fn update_list_view(
    state: State<AppState>,
    payload: UpdateListPayload,
) -> Result<ListPage, String> {
    let page = state
        .board(payload.view)
        .update_list(payload.update)
        .map_err(AppError::from)?;
    Ok(page_with_notes(&state, page)?)
}

#[derive(Debug, Deserialize)]
pub struct QueryReportsPayload {
    pub view: ViewKind,
    pub query: ListQuery,
}

/// Runs an ad-hoc query without touching the view's own controls.
#[tauri::command]
pub fn query_reports(
    state: State<AppState>,
    payload: QueryReportsPayload,
) -> Result<ListPage, String> {
    let page = state
        .board(payload.view)
        .query(&payload.query)
        .map_err(AppError::from)?;
    Ok(page_with_notes(&state, page)?)
}

#[derive(Debug, Deserialize)]
pub struct ReportPayload {
    pub view: ViewKind,
    #[serde(rename = "reportId")]
    pub report_id: i64,
}

#[tauri::command]
pub fn get_report(state: State<AppState>, payload: ReportPayload) -> Result<Report, String> {
    state
        .board(payload.view)
        .report(payload.report_id)
        .ok_or_else(|| AppError::Message("Signalement introuvable.".into()).into())
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusPayload {
    pub view: ViewKind,
    #[serde(rename = "reportId")]
    pub report_id: i64,
    pub status: String,
}

#[tauri::command]
pub async fn change_report_status(
    state: State<'_, AppState>,
    payload: ChangeStatusPayload,
) -> Result<Notice, String> {
    require_any(&state.gate, &MANAGE_TOKENS)?;
    let Some(status) = ReportStatus::parse(&payload.status) else {
        return Err(AppError::Message(format!("Statut inconnu : {}", payload.status)).into());
    };
    Ok(state
        .board(payload.view)
        .change_status(state.api(), payload.report_id, status)
        .await)
}

#[derive(Debug, Deserialize)]
pub struct EditReportPayload {
    pub view: ViewKind,
    #[serde(rename = "reportId")]
    pub report_id: i64,
    pub edit: ReportEdit,
}

#[tauri::command]
pub async fn edit_report(
    state: State<'_, AppState>,
    payload: EditReportPayload,
) -> Result<Notice, String> {
    require_any(&state.gate, &MANAGE_TOKENS)?;
    Ok(state
        .board(payload.view)
        .edit(state.api(), payload.report_id, &payload.edit)
        .await)
}

/// Deletes a report; the local note goes with it.
#[tauri::command]
pub async fn delete_report(
    state: State<'_, AppState>,
    payload: ReportPayload,
) -> Result<Notice, String> {
    require_any(&state.gate, &["reports.delete"])?;
    let notice = state
        .board(payload.view)
        .delete(state.api(), payload.report_id)
        .await;
    if !notice.is_error() {
        state
            .store
            .remove_note(payload.report_id)
            .map_err(AppError::from)?;
        info!(report_id = payload.report_id, "report removed");
    }
    Ok(notice)
}

/// Tears a view down; responses still in flight for it are discarded.
#[tauri::command]
pub fn close_view(state: State<AppState>, payload: ViewPayload) -> Result<(), String> {
    state.board(payload.view).close();
    Ok(())
}
