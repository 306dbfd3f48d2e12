#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows release builds

mod commands;

use std::sync::Arc;

use anyhow::Context;
use tauri::Manager;
use tracing::info;

use fosika_desktop::{api::DashboardApi, config::AppConfig, state::AppState, telemetry};

use commands::*;

fn main() {
    telemetry::init();

    tauri::Builder::default()
        .setup(|app| {
            let config_dir = tauri::api::path::app_config_dir(&app.config());
            let config = AppConfig::load(config_dir.as_deref()).context("failed to load configuration")?;
            let fallback = tauri::api::path::app_local_data_dir(&app.config())
                .context("failed to resolve app data dir")?
                .join("fosika");
            let data_dir = config.resolve_data_dir(&fallback);
            let state = AppState::open(config, &data_dir)?;

            let api: Arc<dyn DashboardApi> = state.api.clone();
            let period = state.config.notification_interval();
            tauri::async_runtime::spawn(Arc::clone(&state.poller).run(api, period));
            info!(interval_secs = period.as_secs(), "notification polling started");

            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            load_permissions,
            reload_permissions,
            check_route,
            sign_in,
            sign_out,
            unread_notifications,
            load_reports,
            update_list_view,
            query_reports,
            get_report,
            change_report_status,
            edit_report,
            delete_report,
            close_view,
            export_reports,
            list_notes,
            save_note,
            load_theme,
            save_theme
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
