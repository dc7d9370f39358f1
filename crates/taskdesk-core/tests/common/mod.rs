#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use taskdesk_core::api::{ListQuery, Pagination, SortOrder, TaskApi, TaskPage};
use taskdesk_core::error::{ApiError, FieldErrors};
use taskdesk_core::list::ListController;
use taskdesk_core::task::{Status, Task, TaskDraft, TaskId};
use taskdesk_core::ui::{Confirm, Notifier, Severity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(ListQuery),
    Create(TaskDraft),
    Update(TaskId, TaskDraft),
    Delete(TaskId),
}

/// How a scripted call should fail.
#[derive(Debug, Clone)]
pub enum Failure {
    Server(u16),
    Validation(FieldErrors),
}

impl Failure {
    fn into_error(self) -> ApiError {
        match self {
            Failure::Server(status) => ApiError::Server {
                status,
                message: "boom".to_string(),
            },
            Failure::Validation(errors) => ApiError::Validation(errors),
        }
    }
}

#[derive(Default)]
struct FakeState {
    tasks: Vec<Task>,
    next_id: TaskId,
    calls: Vec<Call>,
    fail_list: bool,
    fail_create: Option<Failure>,
    fail_update: Option<Failure>,
    fail_delete: bool,
}

/// In-memory task service that filters, sorts and paginates the way the
/// real one does.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        Arc::new(Self {
            state: Mutex::new(FakeState {
                tasks,
                next_id,
                ..FakeState::default()
            }),
        })
    }

    /// `count` pending tasks with ids 1..=count.
    pub fn seeded(count: u64) -> Arc<Self> {
        Self::with_tasks((1..=count).map(|id| task(id, &format!("Task {id}"))).collect())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("lock").calls.clone()
    }

    pub fn list_calls(&self) -> Vec<ListQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::List(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().expect("lock").calls.clear();
    }

    pub fn stored(&self, id: TaskId) -> Option<Task> {
        let state = self.state.lock().expect("lock");
        state.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn fail_lists(&self, fail: bool) {
        self.state.lock().expect("lock").fail_list = fail;
    }

    pub fn fail_create(&self, failure: Failure) {
        self.state.lock().expect("lock").fail_create = Some(failure);
    }

    pub fn fail_update(&self, failure: Failure) {
        self.state.lock().expect("lock").fail_update = Some(failure);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.lock().expect("lock").fail_delete = fail;
    }
}

#[async_trait]
impl TaskApi for FakeApi {
    async fn list(&self, query: &ListQuery) -> Result<TaskPage, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(Call::List(query.clone()));
        if state.fail_list {
            return Err(Failure::Server(500).into_error());
        }

        let mut matching: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| {
                query.filter.title.as_ref().is_none_or(|title| {
                    t.title.to_lowercase().contains(&title.to_lowercase())
                })
            })
            .filter(|t| query.filter.date.is_none_or(|date| t.date == Some(date)))
            .filter(|t| query.filter.status.as_ref().is_none_or(|s| &t.status == s))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match query.sort.by.as_str() {
                "title" => a.title.cmp(&b.title),
                "description" => a.description.cmp(&b.description),
                "date" => a.date.cmp(&b.date),
                "status" => a.status.as_str().cmp(b.status.as_str()),
                _ => a.id.cmp(&b.id),
            };
            match query.sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len() as u64;
        let per_page = query.per_page.max(1);
        let last_page = (total.div_ceil(u64::from(per_page)) as u32).max(1);
        let skip = (query.page.saturating_sub(1) * per_page) as usize;
        let tasks = matching
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        Ok(TaskPage {
            tasks,
            pagination: Pagination {
                current_page: query.page,
                last_page,
                per_page,
                total,
            },
        })
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(Call::Create(draft.clone()));
        if let Some(failure) = state.fail_create.take() {
            return Err(failure.into_error());
        }

        let created = Task {
            id: state.next_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            date: draft.date,
            status: draft.status.clone(),
        };
        state.next_id += 1;
        state.tasks.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: TaskId, draft: &TaskDraft) -> Result<Task, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(Call::Update(id, draft.clone()));
        if let Some(failure) = state.fail_update.take() {
            return Err(failure.into_error());
        }

        let stored = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Failure::Server(404).into_error())?;
        stored.title = draft.title.clone();
        stored.description = draft.description.clone();
        stored.date = draft.date;
        stored.status = draft.status.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: TaskId) -> Result<(), ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(Call::Delete(id));
        if state.fail_delete {
            return Err(Failure::Server(500).into_error());
        }
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(Failure::Server(404).into_error());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<Note>>,
}

impl RecordingNotifier {
    pub fn notes(&self) -> Vec<Note> {
        self.notes.lock().expect("lock").clone()
    }

    pub fn last(&self) -> Option<Note> {
        self.notes().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, title: &str, message: &str) {
        self.notes.lock().expect("lock").push(Note {
            severity,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// Fixed confirmation answer that remembers the prompts it was shown.
pub struct Answer {
    pub accept: bool,
    pub prompts: Vec<String>,
}

impl Answer {
    pub fn yes() -> Self {
        Self {
            accept: true,
            prompts: vec![],
        }
    }

    pub fn no() -> Self {
        Self {
            accept: false,
            prompts: vec![],
        }
    }
}

impl Confirm for Answer {
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.accept)
    }
}

pub fn task(id: TaskId, title: &str) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: String::new(),
        date: None,
        status: Status::Pending,
    }
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn controller(
    api: &Arc<FakeApi>,
    notifier: &Arc<RecordingNotifier>,
) -> ListController<FakeApi> {
    ListController::new(api.clone(), notifier.clone())
}
