use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::api::TaskApi;
use crate::datetime::parse_user_date;
use crate::error::{ApiError, FieldErrors};
use crate::list::ListController;
use crate::task::{Task, TaskDraft};
use crate::ui::{Notifier, Severity};

const CHECK_FIELDS_MESSAGE: &str = "Verifique os campos em vermelho.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Date,
    Status,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Title,
        FormField::Description,
        FormField::Date,
        FormField::Status,
    ];

    /// Field name as used in the service's error map.
    pub fn as_str(self) -> &'static str {
        match self {
            FormField::Title => "title",
            FormField::Description => "description",
            FormField::Date => "date",
            FormField::Status => "status",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown task field: {s}"))
    }
}

/// Result of a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved(Task),
    /// The service rejected fields; see `errors()`.
    Invalid,
    Failed,
    /// Nothing to submit.
    Skipped,
}

struct FailureText {
    title: &'static str,
    generic: &'static str,
}

const CREATE_FAILURE: FailureText = FailureText {
    title: "Erro ao criar tarefa",
    generic: "Não foi possível criar a tarefa.",
};

const UPDATE_FAILURE: FailureText = FailureText {
    title: "Erro ao atualizar tarefa",
    generic: "Não foi possível atualizar a tarefa.",
};

fn set_draft_field(draft: &mut TaskDraft, field: FormField, value: &str) -> anyhow::Result<()> {
    match field {
        FormField::Title => draft.title = value.to_string(),
        FormField::Description => draft.description = value.to_string(),
        FormField::Date if value.trim().is_empty() => draft.date = None,
        FormField::Date => draft.date = Some(parse_user_date(value)?),
        FormField::Status => draft.status = value.parse()?,
    }
    Ok(())
}

/// Stores field errors when present and always tells the user something
/// went wrong.
fn report_failure(
    notifier: &dyn Notifier,
    errors: &mut FieldErrors,
    err: ApiError,
    text: &FailureText,
) -> SubmitOutcome {
    match err {
        ApiError::Validation(fields) => {
            warn!(fields = ?fields, "submission rejected by validation");
            *errors = fields;
            notifier.notify(Severity::Error, text.title, CHECK_FIELDS_MESSAGE);
            SubmitOutcome::Invalid
        }
        other => {
            error!(error = %other, "submission failed");
            notifier.notify(Severity::Error, text.title, text.generic);
            SubmitOutcome::Failed
        }
    }
}

pub struct CreateForm<A: TaskApi> {
    api: Arc<A>,
    notifier: Arc<dyn Notifier>,
    draft: TaskDraft,
    errors: FieldErrors,
    open: bool,
}

impl<A: TaskApi> CreateForm<A> {
    pub fn new(api: Arc<A>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            draft: TaskDraft::default(),
            errors: FieldErrors::default(),
            open: false,
        }
    }

    pub fn show(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> &TaskDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut TaskDraft {
        &mut self.draft
    }

    pub fn set_field(&mut self, field: FormField, value: &str) -> anyhow::Result<()> {
        set_draft_field(&mut self.draft, field, value)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error_for(&self, field: FormField) -> Option<&str> {
        self.errors.first(field.as_str())
    }

    #[tracing::instrument(skip_all, fields(title = %self.draft.title))]
    pub async fn submit(&mut self, list: &mut ListController<A>) -> SubmitOutcome {
        self.errors.clear();

        match self.api.create(&self.draft).await {
            Ok(task) => {
                info!(id = task.id, "task created");
                list.on_task_created(&task).await;
                self.draft = TaskDraft::default();
                self.open = false;
                self.notifier
                    .notify(Severity::Success, "Sucesso", "Tarefa criada com sucesso!");
                SubmitOutcome::Saved(task)
            }
            Err(err) => report_failure(
                self.notifier.as_ref(),
                &mut self.errors,
                err,
                &CREATE_FAILURE,
            ),
        }
    }

    /// Discards the draft and any errors.
    pub fn close(&mut self) {
        debug!("create form closed");
        self.draft = TaskDraft::default();
        self.errors.clear();
        self.open = false;
    }
}

pub struct EditForm<A: TaskApi> {
    api: Arc<A>,
    notifier: Arc<dyn Notifier>,
    selected: Option<Task>,
    draft: Option<TaskDraft>,
    errors: FieldErrors,
    open: bool,
}

impl<A: TaskApi> EditForm<A> {
    pub fn new(api: Arc<A>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            selected: None,
            draft: None,
            errors: FieldErrors::default(),
            open: false,
        }
    }

    /// Row selection. The working copy is re-seeded from the new selection
    /// and the form opens when a task is selected.
    pub fn select(&mut self, task: Option<Task>) {
        debug!(id = ?task.as_ref().map(|t| t.id), "edit selection changed");
        self.draft = task.as_ref().map(TaskDraft::from);
        self.open = task.is_some();
        self.selected = task;
    }

    pub fn selected(&self) -> Option<&Task> {
        self.selected.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> Option<&TaskDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut TaskDraft> {
        self.draft.as_mut()
    }

    pub fn set_field(&mut self, field: FormField, value: &str) -> anyhow::Result<()> {
        let draft = self
            .draft
            .as_mut()
            .ok_or_else(|| anyhow!("no task selected for editing"))?;
        set_draft_field(draft, field, value)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error_for(&self, field: FormField) -> Option<&str> {
        self.errors.first(field.as_str())
    }

    #[tracing::instrument(skip_all, fields(id = ?self.selected.as_ref().map(|t| t.id)))]
    pub async fn submit(&mut self, list: &mut ListController<A>) -> SubmitOutcome {
        let (Some(task), Some(draft)) = (&self.selected, &self.draft) else {
            debug!("nothing selected; edit submit skipped");
            return SubmitOutcome::Skipped;
        };
        let id = task.id;
        self.errors.clear();

        match self.api.update(id, draft).await {
            Ok(updated) => {
                info!(id, "task updated");
                list.on_task_updated(updated.clone()).await;
                self.draft = Some(TaskDraft::from(&updated));
                self.selected = Some(updated.clone());
                self.open = false;
                self.notifier.notify(
                    Severity::Success,
                    "Sucesso",
                    "Tarefa atualizada com sucesso!",
                );
                SubmitOutcome::Saved(updated)
            }
            Err(err) => report_failure(
                self.notifier.as_ref(),
                &mut self.errors,
                err,
                &UPDATE_FAILURE,
            ),
        }
    }

    /// Drops unsaved edits and errors; the selection stays.
    pub fn close(&mut self) {
        debug!("edit form closed");
        self.draft = self.selected.as_ref().map(TaskDraft::from);
        self.errors.clear();
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{FormField, set_draft_field};
    use crate::task::{Status, TaskDraft};

    #[test]
    fn fields_parse_by_wire_name() {
        assert_eq!("Title".parse::<FormField>().expect("title"), FormField::Title);
        assert_eq!(
            "description".parse::<FormField>().expect("description"),
            FormField::Description
        );
        assert!("priority".parse::<FormField>().is_err());
    }

    #[test]
    fn draft_fields_accept_text() {
        let mut draft = TaskDraft::default();
        set_draft_field(&mut draft, FormField::Title, "Buy milk").expect("title");
        set_draft_field(&mut draft, FormField::Date, "2024-01-01").expect("date");
        set_draft_field(&mut draft, FormField::Status, "in_progress").expect("status");
        assert_eq!(draft.title, "Buy milk");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(draft.status, Status::InProgress);

        set_draft_field(&mut draft, FormField::Date, "").expect("clear date");
        assert_eq!(draft.date, None);
        assert!(set_draft_field(&mut draft, FormField::Status, "").is_err());
    }
}
