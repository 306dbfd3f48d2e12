use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::api::{ApiError, DashboardApi, DeleteOutcome};
use crate::models::{Profile, Report, ReportEdit, ReportStatus};

pub fn report(id: i64, status: &str, category: &str) -> Report {
    Report::from_value(json!({
        "id": id,
        "reference": format!("FSK-{id:04}"),
        "status": status,
        "category": category,
        "created_at": "2024-03-01 10:00:00",
        "description": format!("signalement {id}"),
        "name": "Rakoto",
        "city": "Antananarivo",
    }))
    .unwrap()
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Status(u16),
    Rejected,
    NotFound,
    SessionExpired,
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Failure::Status(status) => ApiError::Status {
                status,
                message: format!("HTTP {status}"),
            },
            Failure::Rejected => ApiError::Rejected("refusé".into()),
            Failure::NotFound => ApiError::NotFound("not found".into()),
            Failure::SessionExpired => ApiError::SessionExpired,
        }
    }
}

#[derive(Default)]
struct FakeState {
    role: String,
    fail_profile: bool,
    reports: Vec<Report>,
    scripted: VecDeque<(Duration, Vec<Report>)>,
    list_failure: Option<Failure>,
    status_failure: Option<Failure>,
    edit_failure: Option<Failure>,
    delete_failure: Option<Failure>,
    status_updates: Vec<(i64, ReportStatus)>,
    last_edit: Option<ReportEdit>,
    last_per_page: Option<u32>,
    unread: u64,
    unread_delay: Duration,
    unread_failure: Option<Failure>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    profile_calls: AtomicUsize,
    unread_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.state.lock().role = "admin".into();
        api
    }

    pub fn set_role(&self, role: &str) {
        self.state.lock().role = role.into();
    }

    pub fn fail_profile(&self, fail: bool) {
        self.state.lock().fail_profile = fail;
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn set_reports(&self, reports: Vec<Report>) {
        self.state.lock().reports = reports;
    }

    /// Queues a list response returned after `delay`; queued responses are
    /// consumed before the fixed collection.
    pub fn script_list(&self, delay: Duration, reports: Vec<Report>) {
        self.state.lock().scripted.push_back((delay, reports));
    }

    pub fn fail_list(&self, failure: Option<Failure>) {
        self.state.lock().list_failure = failure;
    }

    pub fn fail_status(&self, failure: Option<Failure>) {
        self.state.lock().status_failure = failure;
    }

    pub fn fail_edit(&self, failure: Option<Failure>) {
        self.state.lock().edit_failure = failure;
    }

    pub fn fail_delete(&self, failure: Option<Failure>) {
        self.state.lock().delete_failure = failure;
    }

    pub fn status_updates(&self) -> Vec<(i64, ReportStatus)> {
        self.state.lock().status_updates.clone()
    }

    pub fn last_edit(&self) -> Option<ReportEdit> {
        self.state.lock().last_edit.clone()
    }

    pub fn last_per_page(&self) -> Option<u32> {
        self.state.lock().last_per_page
    }

    pub fn set_unread(&self, count: u64, delay: Duration) {
        let mut state = self.state.lock();
        state.unread = count;
        state.unread_delay = delay;
    }

    pub fn fail_unread(&self, failure: Option<Failure>) {
        self.state.lock().unread_failure = failure;
    }

    pub fn unread_calls(&self) -> usize {
        self.unread_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn list_reports(&self, per_page: u32) -> Result<Vec<Report>, ApiError> {
        let (delay, result) = {
            let mut state = self.state.lock();
            state.last_per_page = Some(per_page);
            match state.scripted.pop_front() {
                Some((delay, reports)) => (delay, Ok(reports)),
                None => match state.list_failure {
                    Some(failure) => (Duration::ZERO, Err(failure.to_error())),
                    None => (Duration::ZERO, Ok(state.reports.clone())),
                },
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn update_status(&self, report_id: i64, status: ReportStatus) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.status_updates.push((report_id, status));
        match state.status_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    async fn update_report(
        &self,
        _report_id: i64,
        edit: &ReportEdit,
    ) -> Result<Option<Report>, ApiError> {
        let mut state = self.state.lock();
        state.last_edit = Some(edit.clone());
        match state.edit_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(None),
        }
    }

    async fn delete_report(&self, _report_id: i64) -> Result<DeleteOutcome, ApiError> {
        match self.state.lock().delete_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(DeleteOutcome::Deleted),
        }
    }

    async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        if state.fail_profile {
            return Err(ApiError::Status {
                status: 500,
                message: "profile unavailable".into(),
            });
        }
        Ok(Profile {
            id: Some(1),
            name: Some("Staff".into()),
            email: Some("staff@fosika.mg".into()),
            role: state.role.clone(),
        })
    }

    async fn unread_notifications(&self) -> Result<u64, ApiError> {
        self.unread_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = {
            let state = self.state.lock();
            let result = match state.unread_failure {
                Some(failure) => Err(failure.to_error()),
                None => Ok(state.unread),
            };
            (state.unread_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
