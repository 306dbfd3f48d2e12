use serde::Deserialize;
use tauri::State;
use tracing::info;

use fosika_desktop::{
    error::AppError,
    permissions::{PermissionSnapshot, RouteDecision},
    state::AppState,
    storage::CredentialStore,
};

/// Loads the role once per session; later calls reuse it.
#[tauri::command]
pub async fn load_permissions(state: State<'_, AppState>) -> Result<PermissionSnapshot, String> {
    state.gate.ensure_loaded(state.api()).await;
    Ok(state.gate.snapshot())
}

/// Re-fetches the profile; a failure keeps the previous permissions.
#[tauri::command]
pub async fn reload_permissions(state: State<'_, AppState>) -> Result<PermissionSnapshot, String> {
    state.gate.reload(state.api()).await;
    Ok(state.gate.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct RoutePayload {
    pub route: String,
}

#[tauri::command]
pub fn check_route(state: State<AppState>, payload: RoutePayload) -> Result<RouteDecision, String> {
    Ok(state.gate.guard_route(&payload.route))
}

#[derive(Debug, Deserialize)]
pub struct SignInPayload {
    pub token: String,
}

/// Stores the bearer token obtained by the sign-in flow and loads the role.
#[tauri::command]
pub async fn sign_in(
    state: State<'_, AppState>,
    payload: SignInPayload,
) -> Result<PermissionSnapshot, String> {
    let token = payload.token.trim();
    if token.is_empty() {
        return Err(AppError::Message("Jeton d'accès manquant.".into()).into());
    }
    state.store.store_token(token).map_err(AppError::from)?;
    state.reset_session();
    state.gate.reload(state.api()).await;
    Ok(state.gate.snapshot())
}

#[tauri::command]
pub fn sign_out(state: State<AppState>) -> Result<(), String> {
    state.store.clear_token().map_err(AppError::from)?;
    state.reset_session();
    info!("signed out");
    Ok(())
}

/// Last unread count seen by the background poller.
#[tauri::command]
pub fn unread_notifications(state: State<AppState>) -> Result<u64, String> {
    Ok(state.poller.unread())
}
