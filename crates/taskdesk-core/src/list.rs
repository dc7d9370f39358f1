use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::api::{ALLOWED_PER_PAGE, ListQuery, Pagination, Sort, SortOrder, TaskApi, TaskPage};
use crate::error::ApiError;
use crate::filter::TaskFilter;
use crate::task::{Task, TaskId};
use crate::ui::{Confirm, Notifier, Severity};

/// What happened to a list fetch once it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the displayed page.
    Applied,
    /// A newer fetch was issued meanwhile; the response was dropped.
    Stale,
    Failed,
    /// Nothing changed, so no request was sent.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Declined,
    Deleted(FetchOutcome),
    Failed,
}

/// An issued list request. Only the most recently issued ticket may update
/// the displayed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    query: ListQuery,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }
}

pub struct ListController<A: TaskApi> {
    api: Arc<A>,
    notifier: Arc<dyn Notifier>,
    filter: TaskFilter,
    sort: Sort,
    pagination: Pagination,
    tasks: Vec<Task>,
    last_issued: u64,
}

impl<A: TaskApi> ListController<A> {
    pub fn new(api: Arc<A>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            filter: TaskFilter::default(),
            sort: Sort::default(),
            pagination: Pagination::default(),
            tasks: vec![],
            last_issued: 0,
        }
    }

    pub fn with_page_size(mut self, per_page: u32) -> anyhow::Result<Self> {
        check_page_size(per_page)?;
        self.pagination.per_page = per_page;
        Ok(self)
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Replaces filter, page and sort without fetching, e.g. to start from
    /// command-line arguments.
    pub fn restore(&mut self, query: ListQuery) -> anyhow::Result<()> {
        if query.page == 0 {
            return Err(anyhow!("pages start at 1"));
        }
        check_page_size(query.per_page)?;
        self.filter = query.filter;
        self.pagination.current_page = query.page;
        self.pagination.per_page = query.per_page;
        self.sort = query.sort;
        Ok(())
    }

    /// The request the current filter, page and sort describe.
    pub fn current_query(&self) -> ListQuery {
        ListQuery {
            filter: self.filter.clone(),
            page: self.pagination.current_page,
            per_page: self.pagination.per_page,
            sort: self.sort.clone(),
        }
    }

    /// Snapshots the current filter, page and sort into a new ticket.
    ///
    /// `refresh` awaits one fetch at a time; `issue` and `complete` are for
    /// callers that keep several fetches in flight at once.
    pub fn issue(&mut self) -> FetchTicket {
        self.last_issued += 1;
        let ticket = FetchTicket {
            seq: self.last_issued,
            query: self.current_query(),
        };
        debug!(seq = ticket.seq, query = ?ticket.query, "issued list fetch");
        ticket
    }

    /// Applies a finished fetch unless a newer one was issued after it.
    /// Tickets may complete in any order.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<TaskPage, ApiError>,
    ) -> FetchOutcome {
        if ticket.seq != self.last_issued {
            match &result {
                Ok(_) => debug!(
                    seq = ticket.seq,
                    latest = self.last_issued,
                    "discarding stale list response"
                ),
                Err(err) => warn!(
                    seq = ticket.seq,
                    latest = self.last_issued,
                    error = %err,
                    "discarding stale list failure"
                ),
            }
            return FetchOutcome::Stale;
        }

        match result {
            Ok(page) => {
                debug!(
                    seq = ticket.seq,
                    count = page.tasks.len(),
                    current_page = page.pagination.current_page,
                    last_page = page.pagination.last_page,
                    total = page.pagination.total,
                    "applied list response"
                );
                self.tasks = page.tasks;
                self.pagination = page.pagination;
                FetchOutcome::Applied
            }
            Err(err) => {
                error!(seq = ticket.seq, error = %err, "failed fetching tasks");
                self.notifier
                    .notify(Severity::Error, "Erro", "Erro ao buscar tarefas!");
                FetchOutcome::Failed
            }
        }
    }

    /// Re-fetches at the current filter, page and sort.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&mut self) -> FetchOutcome {
        let ticket = self.issue();
        let result = self.api.list(ticket.query()).await;
        self.complete(&ticket, result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_sort(&mut self, sort: Sort) -> FetchOutcome {
        if sort == self.sort {
            return FetchOutcome::Skipped;
        }
        self.sort = sort;
        self.refresh().await
    }

    /// Column header behavior: the active column flips direction, any other
    /// column sorts ascending.
    pub async fn sort_by_column(&mut self, field: &str) -> FetchOutcome {
        let order = if self.sort.by == field {
            self.sort.order.toggled()
        } else {
            SortOrder::Asc
        };
        self.set_sort(Sort {
            by: field.to_string(),
            order,
        })
        .await
    }

    /// Replaces the filter set and goes back to the first page; page size is
    /// kept.
    #[tracing::instrument(skip(self))]
    pub async fn apply_filter(&mut self, filter: TaskFilter) -> FetchOutcome {
        self.filter = filter;
        self.pagination.current_page = 1;
        self.refresh().await
    }

    /// Pagination control change. The page is taken as given: the server
    /// decides what lies beyond its last page.
    #[tracing::instrument(skip(self))]
    pub async fn change_page(&mut self, page: u32, per_page: u32) -> anyhow::Result<FetchOutcome> {
        if page == 0 {
            return Err(anyhow!("pages start at 1"));
        }
        check_page_size(per_page)?;
        self.pagination.current_page = page;
        self.pagination.per_page = per_page;
        Ok(self.refresh().await)
    }

    pub async fn go_to_page(&mut self, page: u32) -> anyhow::Result<FetchOutcome> {
        self.change_page(page, self.pagination.per_page).await
    }

    pub async fn set_page_size(&mut self, per_page: u32) -> anyhow::Result<FetchOutcome> {
        self.change_page(self.pagination.current_page, per_page)
            .await
    }

    /// Looks a task up on the displayed page, then on each page of the
    /// current listing. The displayed page and pagination stay as they are.
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self, id: TaskId) -> Result<Option<Task>, ApiError> {
        if let Some(task) = self.find(id) {
            return Ok(Some(task.clone()));
        }

        let mut query = self.current_query();
        query.page = 1;
        loop {
            let page = self.api.list(&query).await?;
            if let Some(task) = page.tasks.into_iter().find(|task| task.id == id) {
                debug!(page = query.page, "located task");
                return Ok(Some(task));
            }
            if query.page >= page.pagination.last_page {
                return Ok(None);
            }
            query.page += 1;
        }
    }

    #[tracing::instrument(skip(self, task), fields(id = task.id))]
    pub async fn on_task_created(&mut self, task: &Task) -> FetchOutcome {
        info!("task created; refreshing list");
        self.refresh().await
    }

    /// Shows the server's record right away, then re-fetches so ordering and
    /// totals come from the server again.
    #[tracing::instrument(skip(self, task), fields(id = task.id))]
    pub async fn on_task_updated(&mut self, task: Task) -> FetchOutcome {
        self.merge_updated(task);
        self.refresh().await
    }

    /// Replaces the displayed task with the same id. Returns false when the
    /// task is not on the current page.
    pub fn merge_updated(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|shown| shown.id == task.id) {
            Some(shown) => {
                *shown = task;
                true
            }
            None => {
                debug!(id = task.id, "updated task not on the displayed page");
                false
            }
        }
    }

    #[tracing::instrument(skip(self, task, confirm), fields(id = task.id))]
    pub async fn delete(
        &mut self,
        task: &Task,
        confirm: &mut dyn Confirm,
    ) -> anyhow::Result<DeleteOutcome> {
        let prompt = format!("Tem certeza que deseja excluir a tarefa \"{}\"?", task.title);
        if !confirm.confirm(&prompt)? {
            info!("delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        match self.api.delete(task.id).await {
            Ok(()) => {
                self.notifier.notify(
                    Severity::Success,
                    "Sucesso",
                    "Tarefa excluída com sucesso!",
                );
                Ok(DeleteOutcome::Deleted(self.refresh().await))
            }
            Err(err) => {
                error!(error = %err, "failed deleting task");
                self.notifier
                    .notify(Severity::Error, "Erro", "Erro ao excluir tarefa!");
                Ok(DeleteOutcome::Failed)
            }
        }
    }
}

fn check_page_size(per_page: u32) -> anyhow::Result<()> {
    if ALLOWED_PER_PAGE.contains(&per_page) {
        Ok(())
    } else {
        Err(anyhow!(
            "page size must be one of {ALLOWED_PER_PAGE:?}, got {per_page}"
        ))
    }
}
