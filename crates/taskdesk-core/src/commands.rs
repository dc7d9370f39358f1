use std::io::{self, Write};

use anyhow::{Context, anyhow};
use tracing::{info, instrument};

use crate::api::{ListQuery, Sort, TaskApi};
use crate::cli::{AddArgs, Command, DeleteArgs, EditArgs, ListArgs};
use crate::datetime::parse_user_date;
use crate::form::SubmitOutcome;
use crate::list::{DeleteOutcome, FetchOutcome};
use crate::render::Renderer;
use crate::session::Session;
use crate::shell;
use crate::ui::{AssumeYes, Confirm, PromptConfirm};

#[instrument(skip(session, renderer))]
pub async fn dispatch<A: TaskApi>(
    session: &mut Session<A>,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::List(args) => cmd_list(session, renderer, args).await,
        Command::Add(args) => cmd_add(session, renderer, args).await,
        Command::Edit(args) => cmd_edit(session, renderer, args).await,
        Command::Delete(args) => cmd_delete(session, renderer, args).await,
        Command::Shell => {
            let stdin = io::stdin();
            shell::run(session, renderer, stdin.lock(), io::stdout()).await
        }
    }
}

async fn cmd_list<A: TaskApi>(
    session: &mut Session<A>,
    renderer: &Renderer,
    args: ListArgs,
) -> anyhow::Result<()> {
    if let Some(title) = &args.title {
        session.filters.set_title(title.as_str());
    }
    session.filters.set_date(args.date);
    session.filters.set_status(args.status.clone());

    let current = session.list.sort().clone();
    let pagination = session.list.pagination();
    session.list.restore(ListQuery {
        filter: session.filters.normalized(),
        page: args.page.unwrap_or(1),
        per_page: args.per_page.unwrap_or(pagination.per_page),
        sort: Sort {
            by: args.sort_by.unwrap_or(current.by),
            order: args.sort_order.unwrap_or(current.order),
        },
    })?;

    expect_applied(session.list.refresh().await)?;
    print_page(session, renderer)
}

async fn cmd_add<A: TaskApi>(
    session: &mut Session<A>,
    renderer: &Renderer,
    args: AddArgs,
) -> anyhow::Result<()> {
    session.create.show();
    let draft = session.create.draft_mut();
    draft.title = args.title;
    draft.description = args.description;
    draft.date = args.date;
    draft.status = args.status;

    match session.create.submit(&mut session.list).await {
        SubmitOutcome::Saved(task) => {
            info!(id = task.id, "created");
            renderer.write_task(io::stdout().lock(), &task)?;
            Ok(())
        }
        SubmitOutcome::Invalid => {
            renderer.write_field_errors(io::stderr().lock(), session.create.errors())?;
            Err(anyhow!("task was not created"))
        }
        SubmitOutcome::Failed | SubmitOutcome::Skipped => Err(anyhow!("task was not created")),
    }
}

async fn cmd_edit<A: TaskApi>(
    session: &mut Session<A>,
    renderer: &Renderer,
    args: EditArgs,
) -> anyhow::Result<()> {
    let task = session.locate(args.id).await?;
    session.edit.select(Some(task));

    let date = args
        .date
        .map(|raw| match raw.trim() {
            "" => Ok(None),
            value => parse_user_date(value).map(Some),
        })
        .transpose()?;
    let draft = session
        .edit
        .draft_mut()
        .context("no task selected for editing")?;
    if let Some(title) = args.title {
        draft.title = title;
    }
    if let Some(description) = args.description {
        draft.description = description;
    }
    if let Some(date) = date {
        draft.date = date;
    }
    if let Some(status) = args.status {
        draft.status = status;
    }

    match session.edit.submit(&mut session.list).await {
        SubmitOutcome::Saved(task) => {
            renderer.write_task(io::stdout().lock(), &task)?;
            Ok(())
        }
        SubmitOutcome::Invalid => {
            renderer.write_field_errors(io::stderr().lock(), session.edit.errors())?;
            Err(anyhow!("task {} was not updated", args.id))
        }
        SubmitOutcome::Failed | SubmitOutcome::Skipped => {
            Err(anyhow!("task {} was not updated", args.id))
        }
    }
}

async fn cmd_delete<A: TaskApi>(
    session: &mut Session<A>,
    renderer: &Renderer,
    args: DeleteArgs,
) -> anyhow::Result<()> {
    let task = session.locate(args.id).await?;

    let mut prompt;
    let mut assume;
    let confirm: &mut dyn Confirm = if args.yes {
        assume = AssumeYes;
        &mut assume
    } else {
        prompt = PromptConfirm::new(io::stdin().lock(), io::stderr());
        &mut prompt
    };

    match session.list.delete(&task, confirm).await? {
        DeleteOutcome::Declined => {
            writeln!(io::stderr(), "Exclusão cancelada.")?;
            Ok(())
        }
        DeleteOutcome::Deleted(_) => print_page(session, renderer),
        DeleteOutcome::Failed => Err(anyhow!("task {} was not deleted", args.id)),
    }
}

fn expect_applied(outcome: FetchOutcome) -> anyhow::Result<()> {
    match outcome {
        FetchOutcome::Applied | FetchOutcome::Skipped => Ok(()),
        FetchOutcome::Stale | FetchOutcome::Failed => Err(anyhow!("failed listing tasks")),
    }
}

fn print_page<A: TaskApi>(session: &Session<A>, renderer: &Renderer) -> anyhow::Result<()> {
    renderer.print_task_page(
        session.list.tasks(),
        session.list.pagination(),
        session.list.sort(),
    )
}
