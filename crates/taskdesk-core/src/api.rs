use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::datetime::format_wire_date;
use crate::error::{ApiError, FieldErrors};
use crate::filter::TaskFilter;
use crate::task::{Task, TaskDraft, TaskId};

pub const ALLOWED_PER_PAGE: [u32; 5] = [5, 10, 20, 50, 100];
pub const DEFAULT_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(anyhow!("invalid sort order: {other} (expected asc or desc)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub by: String,
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            by: "id".to_string(),
            order: SortOrder::Asc,
        }
    }
}

/// Everything a list request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: TaskFilter,
    pub page: u32,
    pub per_page: u32,
    pub sort: Sort,
}

impl ListQuery {
    /// Query parameters in wire form. Absent filter fields are omitted;
    /// pagination and sort are always sent.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        if let Some(title) = &self.filter.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(date) = self.filter.date {
            pairs.push(("date", format_wire_date(Some(date))));
        }
        if let Some(status) = &self.filter.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("perPage", self.per_page.to_string()));
        pairs.push(("sortBy", self.sort.by.clone()));
        pairs.push(("sortOrder", self.sort.order.as_str().to_string()));
        pairs
    }
}

/// Pagination metadata exactly as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            last_page: 1,
            per_page: DEFAULT_PER_PAGE,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct PaginatedResponse {
    data: Vec<Task>,
    current_page: u32,
    last_page: u32,
    per_page: u32,
    total: u64,
}

impl From<PaginatedResponse> for TaskPage {
    fn from(resp: PaginatedResponse) -> Self {
        Self {
            tasks: resp.data,
            pagination: Pagination {
                current_page: resp.current_page,
                last_page: resp.last_page,
                per_page: resp.per_page,
                total: resp.total,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    #[serde(default)]
    message: Option<String>,
    task: Task,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<FieldErrors>,
}

/// The remote task collection.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<TaskPage, ApiError>;

    async fn create(&self, draft: &TaskDraft) -> Result<Task, ApiError>;

    async fn update(&self, id: TaskId, draft: &TaskDraft) -> Result<Task, ApiError>;

    async fn delete(&self, id: TaskId) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
}

impl HttpTaskApi {
    #[tracing::instrument(skip(timeout))]
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let parsed =
            Url::parse(&base_url).with_context(|| format!("invalid API base URL: {base_url}"))?;
        if parsed.cannot_be_a_base() {
            return Err(anyhow!("API base URL cannot carry paths: {base_url}"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client")?;

        info!(base_url = %base_url, timeout_secs = timeout.as_secs(), "configured task API client");
        Ok(Self { client, base_url })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Self::new(&cfg.api_url(), cfg.api_timeout()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|err| ApiError::InvalidUrl(format!("{raw}: {err}")))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "received response");

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_failure(status, &body))
        }
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    #[tracing::instrument(skip(self), fields(page = query.page, per_page = query.per_page))]
    async fn list(&self, query: &ListQuery) -> Result<TaskPage, ApiError> {
        let mut url = self.endpoint("/tasks")?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());

        self.execute_json::<PaginatedResponse>(self.client.get(url))
            .await
            .map(TaskPage::from)
            .inspect(|page| debug!(count = page.tasks.len(), total = page.pagination.total, "listed tasks"))
            .inspect_err(|err| error!(error = %err, "failed listing tasks"))
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    async fn create(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let url = self.endpoint("/task/create")?;
        self.execute_json::<TaskEnvelope>(self.client.post(url).json(draft))
            .await
            .map(|envelope| {
                info!(id = envelope.task.id, message = ?envelope.message, "created task");
                envelope.task
            })
            .inspect_err(|err| error!(error = %err, "failed creating task"))
    }

    #[tracing::instrument(skip(self, draft))]
    async fn update(&self, id: TaskId, draft: &TaskDraft) -> Result<Task, ApiError> {
        let url = self.endpoint(&format!("/task/{id}"))?;
        self.execute_json::<TaskEnvelope>(self.client.put(url).json(draft))
            .await
            .map(|envelope| {
                info!(id = envelope.task.id, message = ?envelope.message, "updated task");
                envelope.task
            })
            .inspect_err(|err| error!(error = %err, "failed updating task"))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: TaskId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/task/{id}"))?;
        self.execute(self.client.delete(url))
            .await
            .map(|_| info!(id, "deleted task"))
            .inspect_err(|err| error!(error = %err, "failed deleting task"))
    }
}

/// Maps a non-success response to the validation or the generic server
/// failure.
fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(errors) = parsed.errors
        && !errors.is_empty()
    {
        return ApiError::Validation(errors);
    }

    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    ApiError::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use reqwest::StatusCode;

    use super::{ListQuery, Sort, SortOrder, classify_failure};
    use crate::error::ApiError;
    use crate::filter::TaskFilter;
    use crate::task::Status;

    fn query(filter: TaskFilter) -> ListQuery {
        ListQuery {
            filter,
            page: 2,
            per_page: 20,
            sort: Sort {
                by: "date".to_string(),
                order: SortOrder::Desc,
            },
        }
    }

    #[test]
    fn absent_filters_are_not_sent() {
        let pairs = query(TaskFilter::default()).query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("page", "2".to_string()),
                ("perPage", "20".to_string()),
                ("sortBy", "date".to_string()),
                ("sortOrder", "desc".to_string()),
            ]
        );
    }

    #[test]
    fn present_filters_are_sent_in_wire_form() {
        let pairs = query(TaskFilter {
            title: Some("milk".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            status: Some(Status::InProgress),
        })
        .query_pairs();

        assert_eq!(pairs[0], ("title", "milk".to_string()));
        assert_eq!(pairs[1], ("date", "2024-01-01".to_string()));
        assert_eq!(pairs[2], ("status", "in_progress".to_string()));
        assert_eq!(pairs.len(), 7);
    }

    #[test]
    fn error_map_becomes_validation_failure() {
        let err = classify_failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"The title field is required.","errors":{"title":["The title field is required."]}}"#,
        );
        let errors = err.field_errors().expect("validation errors");
        assert_eq!(errors.first("title"), Some("The title field is required."));
    }

    #[test]
    fn other_failures_keep_status_and_message() {
        match classify_failure(StatusCode::NOT_FOUND, r#"{"message":"Task not found"}"#) {
            ApiError::Server { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Task not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match classify_failure(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") {
            ApiError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sort_order_parses_and_toggles() {
        assert_eq!("DESC".parse::<SortOrder>().expect("parse"), SortOrder::Desc);
        assert_eq!(SortOrder::Asc.toggled(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
