//! Local state only changes after the API confirmed a mutation, except that a
//! delete the API answers with 404 still removes the report.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    api::{ApiError, DashboardApi, DeleteOutcome},
    models::{Report, ReportEdit, ReportStatus},
    notice::Notice,
    pipeline::{self, ListPage, ListQuery, ListState, ListUpdate, UnknownStatus, ViewKind},
};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("reports have not been loaded yet")]
    NotLoaded,
    #[error(transparent)]
    Filter(#[from] UnknownStatus),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The last fetch failed; the UI offers a retry.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(usize),
    /// A newer fetch was issued (or the view closed) while this one was in flight.
    Stale,
}

#[derive(Debug, Default)]
struct BoardInner {
    reports: Vec<Report>,
    loaded: bool,
    fetch: FetchState,
    generation: u64,
    list: ListState,
}

pub struct ReportBoard {
    view: ViewKind,
    per_page: u32,
    inner: Mutex<BoardInner>,
}

impl ReportBoard {
    pub fn new(view: ViewKind, per_page: u32) -> Self {
        Self {
            view,
            per_page,
            inner: Mutex::new(BoardInner::default()),
        }
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn fetch_state(&self) -> FetchState {
        self.inner.lock().fetch.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().loaded
    }

    /// Fetches the whole collection. Only the most recently issued fetch may
    /// replace the working set; older responses are dropped.
    pub async fn refresh(&self, api: &dyn DashboardApi) -> Result<RefreshOutcome, BoardError> {
        let ticket = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.fetch = FetchState::Loading;
            inner.generation
        };
        debug!(view = ?self.view, ticket, "refreshing reports");

        let result = api.list_reports(self.per_page).await;

        let mut inner = self.inner.lock();
        if inner.generation != ticket {
            debug!(view = ?self.view, ticket, current = inner.generation, "discarding stale fetch");
            return Ok(RefreshOutcome::Stale);
        }
        match result {
            Ok(reports) => {
                let count = reports.len();
                inner.reports = reports;
                inner.loaded = true;
                inner.fetch = FetchState::Ready;
                info!(view = ?self.view, count, "reports loaded");
                Ok(RefreshOutcome::Applied(count))
            }
            Err(err) => {
                warn!(view = ?self.view, error = %err, "failed to load reports");
                inner.fetch = FetchState::Failed(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Tears the view down; responses still in flight are discarded.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        let generation = inner.generation + 1;
        *inner = BoardInner {
            generation,
            ..BoardInner::default()
        };
        debug!(view = ?self.view, "view closed");
    }

    /// Runs the pipeline with an explicit query, leaving the view's own state alone.
    pub fn query(&self, query: &ListQuery) -> Result<ListPage, BoardError> {
        let inner = self.inner.lock();
        if !inner.loaded {
            return Err(BoardError::NotLoaded);
        }
        Ok(pipeline::run(&inner.reports, query, self.view.policy()))
    }

    pub fn list_query(&self) -> ListQuery {
        self.inner.lock().list.query().clone()
    }

    pub fn update_list(&self, update: ListUpdate) -> Result<ListPage, BoardError> {
        let mut inner = self.inner.lock();
        inner.list.apply(update)?;
        if !inner.loaded {
            return Err(BoardError::NotLoaded);
        }
        let BoardInner { reports, list, .. } = &mut *inner;
        Ok(list.run(reports, self.view.policy()))
    }

    pub fn current_page(&self) -> Result<ListPage, BoardError> {
        let mut inner = self.inner.lock();
        if !inner.loaded {
            return Err(BoardError::NotLoaded);
        }
        let BoardInner { reports, list, .. } = &mut *inner;
        Ok(list.run(reports, self.view.policy()))
    }

    pub fn selection(&self) -> Result<Vec<Report>, BoardError> {
        let inner = self.inner.lock();
        if !inner.loaded {
            return Err(BoardError::NotLoaded);
        }
        let indices = pipeline::select(&inner.reports, inner.list.query(), self.view.policy());
        Ok(indices
            .into_iter()
            .map(|idx| inner.reports[idx].clone())
            .collect())
    }

    pub fn report(&self, report_id: i64) -> Option<Report> {
        self.inner
            .lock()
            .reports
            .iter()
            .find(|report| report.id == report_id)
            .cloned()
    }

    fn reference_of(&self, report_id: i64) -> Option<String> {
        self.report(report_id).map(|report| {
            if report.reference.trim().is_empty() {
                format!("#{}", report.id)
            } else {
                report.reference
            }
        })
    }

    pub async fn change_status(
        &self,
        api: &dyn DashboardApi,
        report_id: i64,
        status: ReportStatus,
    ) -> Notice {
        let Some(reference) = self.reference_of(report_id) else {
            return Notice::error("Signalement introuvable.");
        };
        if status == ReportStatus::Unknown {
            return Notice::error("Statut invalide.");
        }
        match api.update_status(report_id, status).await {
            Ok(()) => {
                let mut inner = self.inner.lock();
                if let Some(report) = inner.reports.iter_mut().find(|r| r.id == report_id) {
                    report.status = status;
                }
                Notice::success(format!(
                    "Statut du signalement {reference} mis à jour : {}.",
                    status.label()
                ))
            }
            Err(err) => {
                warn!(report_id, error = %err, "status update rejected");
                Notice::from_api_error("Échec de la mise à jour du statut", &err)
            }
        }
    }

    pub async fn edit(&self, api: &dyn DashboardApi, report_id: i64, edit: &ReportEdit) -> Notice {
        let Some(current) = self.report(report_id) else {
            return Notice::error("Signalement introuvable.");
        };
        let edit = edit.sanitized_for(&current);
        if edit.is_empty() {
            return Notice::info("Aucune modification à enregistrer.");
        }
        match api.update_report(report_id, &edit).await {
            Ok(echoed) => {
                let mut inner = self.inner.lock();
                if let Some(report) = inner.reports.iter_mut().find(|r| r.id == report_id) {
                    match echoed {
                        Some(updated) if updated.id == report_id => *report = updated,
                        _ => report.apply_edit(&edit),
                    }
                }
                Notice::success(format!("Signalement {} modifié.", current.reference))
            }
            Err(err) => {
                warn!(report_id, error = %err, "report edit rejected");
                Notice::from_api_error("Échec de la modification", &err)
            }
        }
    }

    /// Deletes a report. A 404 from the API means it is already absent, which
    /// counts as success and removes it locally too.
    pub async fn delete(&self, api: &dyn DashboardApi, report_id: i64) -> Notice {
        let reference = self
            .reference_of(report_id)
            .unwrap_or_else(|| format!("#{report_id}"));
        let outcome = match api.delete_report(report_id).await {
            Ok(outcome) => outcome,
            Err(ApiError::NotFound(_)) => DeleteOutcome::AlreadyGone,
            Err(err) => {
                warn!(report_id, error = %err, "report deletion rejected");
                return Notice::from_api_error("Échec de la suppression", &err);
            }
        };
        self.inner.lock().reports.retain(|report| report.id != report_id);
        match outcome {
            DeleteOutcome::Deleted => Notice::success(format!("Signalement {reference} supprimé.")),
            DeleteOutcome::AlreadyGone => Notice::info(format!(
                "Le signalement {reference} avait déjà été supprimé."
            )),
        }
    }
}
