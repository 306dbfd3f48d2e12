use serde::{Deserialize, Serialize};
use tauri::State;

use fosika_desktop::{
    error::AppError,
    settings::{self, StyleTokens, ThemeSettings},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ThemePayload {
    #[serde(default)]
    pub settings: Option<ThemeSettings>,
    #[serde(rename = "systemPrefersDark", default)]
    pub system_prefers_dark: bool,
}

#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub settings: ThemeSettings,
    pub tokens: StyleTokens,
}

#[tauri::command]
pub fn load_theme(state: State<AppState>, payload: ThemePayload) -> Result<ThemeResponse, String> {
    let settings = settings::load_theme(&*state.store).map_err(AppError::from)?;
    Ok(ThemeResponse {
        tokens: settings::style_tokens(&settings, payload.system_prefers_dark),
        settings,
    })
}

#[tauri::command]
pub fn save_theme(state: State<AppState>, payload: ThemePayload) -> Result<ThemeResponse, String> {
    let settings = payload.settings.unwrap_or_default();
    settings::save_theme(&*state.store, &settings).map_err(AppError::from)?;
    Ok(ThemeResponse {
        tokens: settings::style_tokens(&settings, payload.system_prefers_dark),
        settings,
    })
}
