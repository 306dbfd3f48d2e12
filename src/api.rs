//! All calls go to one configured base origin with the stored bearer token
//! attached. Responses use the `{ success, data, message }` envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    models::{Profile, Report, ReportEdit, ReportStatus},
    storage::CredentialStore,
};

/// Paths where a 401 is an expected answer rather than an expired session.
const AUTH_WHITELIST: [&str; 3] = ["/login", "/logout", "/verify-2fa"];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session expired, sign in again")]
    SessionExpired,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("additional verification required")]
    VerificationRequired,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request rejected ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("API reported failure: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The API no longer knows the report (404).
    AlreadyGone,
}

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Fetches the whole report collection in one request.
    async fn list_reports(&self, per_page: u32) -> Result<Vec<Report>, ApiError>;
    async fn update_status(&self, report_id: i64, status: ReportStatus) -> Result<(), ApiError>;
    /// Returns the updated record when the API echoes it back.
    async fn update_report(
        &self,
        report_id: i64,
        edit: &ReportEdit,
    ) -> Result<Option<Report>, ApiError>;
    async fn delete_report(&self, report_id: i64) -> Result<DeleteOutcome, ApiError>;
    async fn fetch_profile(&self) -> Result<Profile, ApiError>;
    async fn unread_notifications(&self) -> Result<u64, ApiError>;
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// Report arrays arrive bare or wrapped in a paginator object.
fn extract_report_items(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

pub(crate) fn decode_reports(data: Value) -> Vec<Report> {
    let items = extract_report_items(data);
    let received = items.len();
    let reports: Vec<Report> = items.into_iter().filter_map(Report::from_value).collect();
    if reports.len() != received {
        warn!(
            received,
            kept = reports.len(),
            "some report records could not be decoded"
        );
    }
    reports
}

fn decode_profile(data: Value) -> Result<Profile, ApiError> {
    let value = match data {
        Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
            map.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("profile: {e}")))
}

fn decode_unread_count(data: Option<Value>) -> u64 {
    match data {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(map)) => map
            .get("count")
            .or_else(|| map.get("unread_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0),
        _ => 0,
    }
}

fn body_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

fn requires_verification(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .map(|value| {
            ["requires_verification", "requires_2fa"]
                .iter()
                .any(|flag| value.get(*flag).and_then(Value::as_bool).unwrap_or(false))
        })
        .unwrap_or(false)
}

/// `reqwest`-backed [`DashboardApi`].
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpApi {
    pub fn new(config: &AppConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("fosika-desktop/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match self.credentials.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Maps non-success statuses; a 401 outside the whitelist tears the session down.
    async fn check(&self, path: &str, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED => {
                if AUTH_WHITELIST.iter().any(|p| path.starts_with(p)) {
                    return Err(ApiError::Unauthorized(body_message(&body)));
                }
                warn!(path, "session rejected by API, clearing stored credentials");
                if let Err(err) = self.credentials.clear_token() {
                    warn!(error = %err, "failed to clear stored credentials");
                }
                Err(ApiError::SessionExpired)
            }
            StatusCode::FORBIDDEN if requires_verification(&body) => {
                info!(path, "API requested step-up verification");
                Err(ApiError::VerificationRequired)
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path.to_string())),
            other => Err(ApiError::Status {
                status: other.as_u16(),
                message: body_message(&body),
            }),
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let response = self.authorize(request).send().await?;
        let response = self.check(path, response).await?;
        let body = response.bytes().await?;
        // 204 and friends carry no envelope
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| ApiError::Decode(format!("{path}: {e}")))?;
        envelope.into_result()
    }
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn list_reports(&self, per_page: u32) -> Result<Vec<Report>, ApiError> {
        let path = "/reports";
        debug!(per_page, "fetching report collection");
        let request = self
            .client
            .get(self.url(path))
            .query(&[("per_page", per_page)]);
        let data: Option<Value> = self.send(path, request).await?;
        let reports = decode_reports(data.unwrap_or(Value::Null));
        info!(count = reports.len(), "report collection fetched");
        Ok(reports)
    }

    async fn update_status(&self, report_id: i64, status: ReportStatus) -> Result<(), ApiError> {
        let path = format!("/reports/{report_id}/status");
        let request = self
            .client
            .put(self.url(&path))
            .json(&json!({ "status": status.as_wire() }));
        let _: Option<Value> = self.send(&path, request).await?;
        info!(report_id, status = status.as_wire(), "report status updated");
        Ok(())
    }

    async fn update_report(
        &self,
        report_id: i64,
        edit: &ReportEdit,
    ) -> Result<Option<Report>, ApiError> {
        let path = format!("/reports/{report_id}");
        let request = self.client.put(self.url(&path)).json(edit);
        let data: Option<Value> = self.send(&path, request).await?;
        info!(report_id, "report updated");
        Ok(data
            .filter(Value::is_object)
            .and_then(Report::from_value))
    }

    async fn delete_report(&self, report_id: i64) -> Result<DeleteOutcome, ApiError> {
        let path = format!("/reports/{report_id}");
        let request = self.client.delete(self.url(&path));
        match self.send::<Value>(&path, request).await {
            Ok(_) => {
                info!(report_id, "report deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(ApiError::NotFound(_)) => {
                info!(report_id, "report already absent on the API");
                Ok(DeleteOutcome::AlreadyGone)
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        let path = "/profile";
        let request = self.client.get(self.url(path));
        let data: Option<Value> = self.send(path, request).await?;
        let data = data.ok_or_else(|| ApiError::Decode("profile: empty payload".into()))?;
        decode_profile(data)
    }

    async fn unread_notifications(&self) -> Result<u64, ApiError> {
        let path = "/notifications/unread-count";
        let request = self.client.get(self.url(path));
        let data: Option<Value> = self.send(path, request).await?;
        Ok(decode_unread_count(data))
    }
}
