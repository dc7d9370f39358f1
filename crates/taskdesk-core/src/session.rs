use std::sync::Arc;

use anyhow::{Context, anyhow};

use crate::api::TaskApi;
use crate::config::Config;
use crate::filter::FilterState;
use crate::form::{CreateForm, EditForm};
use crate::list::ListController;
use crate::task::{Task, TaskId};
use crate::ui::Notifier;

/// All controllers of one client session, wired to the same service and
/// notification sink.
pub struct Session<A: TaskApi> {
    pub list: ListController<A>,
    pub filters: FilterState,
    pub create: CreateForm<A>,
    pub edit: EditForm<A>,
}

impl<A: TaskApi> Session<A> {
    pub fn new(api: Arc<A>, notifier: Arc<dyn Notifier>, cfg: &Config) -> anyhow::Result<Self> {
        let list = ListController::new(api.clone(), notifier.clone())
            .with_page_size(cfg.page_size()?)?
            .with_sort(cfg.sort()?);

        Ok(Self {
            list,
            filters: FilterState::new(),
            create: CreateForm::new(api.clone(), notifier.clone()),
            edit: EditForm::new(api, notifier),
        })
    }

    /// Finds a task by id without moving the displayed page.
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self, id: TaskId) -> anyhow::Result<Task> {
        self.list
            .locate(id)
            .await
            .with_context(|| format!("failed looking up task {id}"))?
            .ok_or_else(|| anyhow!("task {id} not found"))
    }
}
