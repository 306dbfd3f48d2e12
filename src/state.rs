use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    api::{DashboardApi, HttpApi},
    board::ReportBoard,
    config::AppConfig,
    notifications::NotificationPoller,
    permissions::PermissionGate,
    pipeline::ViewKind,
    storage::LocalStore,
};

/// Everything the desktop shell shares between commands.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<LocalStore>,
    pub api: Arc<HttpApi>,
    pub gate: PermissionGate,
    pub poller: Arc<NotificationPoller>,
    boards: HashMap<ViewKind, ReportBoard>,
}

impl AppState {
    pub fn open(config: AppConfig, data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create app data dir {:?}", data_dir))?;
        let store = Arc::new(LocalStore::open(data_dir)?);
        let api = Arc::new(
            HttpApi::new(&config, store.clone()).context("failed to build API client")?,
        );
        let boards = ViewKind::ALL
            .into_iter()
            .map(|view| (view, ReportBoard::new(view, config.per_page)))
            .collect();
        info!(data_dir = %data_dir.display(), api = %config.api_base_url, "application state ready");
        Ok(Self {
            config,
            store,
            api,
            gate: PermissionGate::new(),
            poller: Arc::new(NotificationPoller::new()),
            boards,
        })
    }

    pub fn board(&self, view: ViewKind) -> &ReportBoard {
        // every view gets a board in `open`
        &self.boards[&view]
    }

    pub fn api(&self) -> &dyn DashboardApi {
        self.api.as_ref()
    }

    /// Drops every view and the cached role; used on sign-out.
    pub fn reset_session(&self) {
        for board in self.boards.values() {
            board.close();
        }
        self.gate.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CredentialStore;

    #[test]
    fn open_creates_one_board_per_view() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(AppConfig::default(), &dir.path().join("data")).unwrap();
        for view in ViewKind::ALL {
            assert_eq!(state.board(view).view(), view);
            assert!(!state.board(view).is_loaded());
        }
        state.store.store_token("abc").unwrap();
        state.reset_session();
        assert!(!state.gate.is_loaded());
        assert_eq!(state.store.token().as_deref(), Some("abc"));
    }
}
