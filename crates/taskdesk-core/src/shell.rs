use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, warn};

use crate::api::{Sort, SortOrder, TaskApi};
use crate::filter::FilterField;
use crate::form::{FormField, SubmitOutcome};
use crate::list::{DeleteOutcome, FetchOutcome};
use crate::render::Renderer;
use crate::session::Session;
use crate::task::TaskId;
use crate::ui::PromptConfirm;

const PROMPT: &str = "taskdesk> ";

const HELP: &str = "\
comandos:
  list                         recarrega e mostra a página atual
  show <id>                    mostra uma tarefa
  filter campo=valor ...       edita o rascunho de filtros (title, date, status)
  filters                      mostra rascunho e filtros aplicados
  apply                        aplica o rascunho e volta à página 1
  reset                        limpa os filtros
  page <n>                     vai para a página n
  per-page <n>                 tarefas por página (5, 10, 20, 50, 100)
  sort <campo> [asc|desc]      ordena; sem direção alterna a coluna atual
  new campo=valor ...          cria uma tarefa (title, description, date, status)
  edit <id> campo=valor ...    altera uma tarefa
  delete <id>                  exclui uma tarefa após confirmação
  cancel                       descarta os formulários abertos
  help                         esta ajuda
  quit                         sai";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Show(TaskId),
    Filter(Vec<(FilterField, String)>),
    Filters,
    Apply,
    Reset,
    Page(u32),
    PerPage(u32),
    Sort {
        field: String,
        order: Option<SortOrder>,
    },
    New(Vec<(FormField, String)>),
    Edit(TaskId, Vec<(FormField, String)>),
    Delete(TaskId),
    Cancel,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ShellCommand>> {
    let words = split_words(line)?;
    let Some((head, rest)) = words.split_first() else {
        return Ok(None);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "list" | "ls" => ShellCommand::List,
        "show" => ShellCommand::Show(single_id(rest)?),
        "filter" => ShellCommand::Filter(assignments(rest)?),
        "filters" => ShellCommand::Filters,
        "apply" => ShellCommand::Apply,
        "reset" => ShellCommand::Reset,
        "page" => ShellCommand::Page(single_number(rest, "page")?),
        "per-page" => ShellCommand::PerPage(single_number(rest, "per-page")?),
        "sort" => match rest {
            [field] => ShellCommand::Sort {
                field: field.clone(),
                order: None,
            },
            [field, order] => ShellCommand::Sort {
                field: field.clone(),
                order: Some(order.parse()?),
            },
            _ => return Err(anyhow!("usage: sort <field> [asc|desc]")),
        },
        "new" | "add" => ShellCommand::New(assignments(rest)?),
        "edit" => {
            let (id, fields) = rest
                .split_first()
                .ok_or_else(|| anyhow!("usage: edit <id> field=value ..."))?;
            ShellCommand::Edit(parse_id(id)?, assignments(fields)?)
        }
        "delete" | "rm" => ShellCommand::Delete(single_id(rest)?),
        "cancel" => ShellCommand::Cancel,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(anyhow!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

fn parse_id(raw: &str) -> anyhow::Result<TaskId> {
    raw.parse::<TaskId>()
        .with_context(|| format!("invalid task id: {raw}"))
}

fn single_id(rest: &[String]) -> anyhow::Result<TaskId> {
    match rest {
        [id] => parse_id(id),
        _ => Err(anyhow!("expected exactly one task id")),
    }
}

fn single_number(rest: &[String], name: &str) -> anyhow::Result<u32> {
    match rest {
        [n] => n
            .parse::<u32>()
            .with_context(|| format!("invalid number for {name}: {n}")),
        _ => Err(anyhow!("usage: {name} <n>")),
    }
}

fn assignments<F>(words: &[String]) -> anyhow::Result<Vec<(F, String)>>
where
    F: std::str::FromStr<Err = anyhow::Error>,
{
    words
        .iter()
        .map(|word| {
            let (key, value) = word
                .split_once('=')
                .ok_or_else(|| anyhow!("expected field=value, got: {word}"))?;
            Ok((key.parse::<F>()?, value.to_string()))
        })
        .collect()
}

/// Whitespace split honoring double quotes, so `title="Buy milk"` is one word.
fn split_words(line: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err(anyhow!("unterminated quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Interactive loop over one session. Command errors are reported and the
/// loop goes on; only I/O failures end it.
pub async fn run<A, R, W>(
    session: &mut Session<A>,
    renderer: &Renderer,
    mut input: R,
    mut out: W,
) -> anyhow::Result<()>
where
    A: TaskApi,
    R: BufRead,
    W: Write,
{
    if session.list.refresh().await == FetchOutcome::Applied {
        write_page(session, renderer, &mut out)?;
    }

    let mut line = String::new();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "erro: {err:#}")?;
                continue;
            }
        };
        debug!(?command, "shell command");

        if command == ShellCommand::Quit {
            return Ok(());
        }
        if let Err(err) = execute(session, renderer, command, &mut input, &mut out).await {
            warn!(error = %err, "shell command failed");
            writeln!(out, "erro: {err:#}")?;
        }
    }
}

async fn execute<A, R, W>(
    session: &mut Session<A>,
    renderer: &Renderer,
    command: ShellCommand,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<()>
where
    A: TaskApi,
    R: BufRead,
    W: Write,
{
    match command {
        ShellCommand::List => {
            let outcome = session.list.refresh().await;
            show_if_applied(session, renderer, out, outcome)?;
        }
        ShellCommand::Show(id) => {
            let task = session.locate(id).await?;
            renderer.write_task(&mut *out, &task)?;
        }
        ShellCommand::Filter(fields) => {
            for (field, value) in fields {
                session.filters.set_field(field, &value)?;
            }
            renderer.write_filters(&mut *out, &session.filters, session.list.filter())?;
        }
        ShellCommand::Filters => {
            renderer.write_filters(&mut *out, &session.filters, session.list.filter())?;
        }
        ShellCommand::Apply => {
            let outcome = session.filters.apply(&mut session.list).await;
            show_if_applied(session, renderer, out, outcome)?;
        }
        ShellCommand::Reset => {
            let outcome = session.filters.reset(&mut session.list).await;
            show_if_applied(session, renderer, out, outcome)?;
        }
        ShellCommand::Page(page) => {
            let outcome = session.list.go_to_page(page).await?;
            show_if_applied(session, renderer, out, outcome)?;
        }
        ShellCommand::PerPage(per_page) => {
            let outcome = session.list.set_page_size(per_page).await?;
            show_if_applied(session, renderer, out, outcome)?;
        }
        ShellCommand::Sort { field, order } => {
            let outcome = match order {
                Some(order) => session.list.set_sort(Sort { by: field, order }).await,
                None => session.list.sort_by_column(&field).await,
            };
            show_if_applied(session, renderer, out, outcome)?;
        }
        ShellCommand::New(fields) => {
            session.create.show();
            for (field, value) in fields {
                session.create.set_field(field, &value)?;
            }
            match session.create.submit(&mut session.list).await {
                SubmitOutcome::Saved(task) => {
                    renderer.write_task(&mut *out, &task)?;
                    write_page(session, renderer, out)?;
                }
                SubmitOutcome::Invalid => {
                    renderer.write_draft(&mut *out, session.create.draft())?;
                    renderer.write_field_errors(&mut *out, session.create.errors())?;
                    writeln!(out, "(corrija com `new campo=valor ...` ou `cancel`)")?;
                }
                SubmitOutcome::Failed | SubmitOutcome::Skipped => {}
            }
        }
        ShellCommand::Edit(id, fields) => {
            let reuse = session.edit.is_open() && session.edit.selected().map(|t| t.id) == Some(id);
            if !reuse {
                let task = session.locate(id).await?;
                session.edit.select(Some(task));
            }
            for (field, value) in fields {
                session.edit.set_field(field, &value)?;
            }
            match session.edit.submit(&mut session.list).await {
                SubmitOutcome::Saved(task) => {
                    renderer.write_task(&mut *out, &task)?;
                    write_page(session, renderer, out)?;
                }
                SubmitOutcome::Invalid => {
                    if let Some(draft) = session.edit.draft() {
                        renderer.write_draft(&mut *out, draft)?;
                    }
                    renderer.write_field_errors(&mut *out, session.edit.errors())?;
                    writeln!(out, "(corrija com `edit {id} campo=valor ...` ou `cancel`)")?;
                }
                SubmitOutcome::Failed | SubmitOutcome::Skipped => {}
            }
        }
        ShellCommand::Delete(id) => {
            let task = session.locate(id).await?;
            let mut confirm = PromptConfirm::new(&mut *input, &mut *out);
            let outcome = session.list.delete(&task, &mut confirm).await?;
            match outcome {
                DeleteOutcome::Declined => writeln!(out, "Exclusão cancelada.")?,
                DeleteOutcome::Deleted(fetch) => show_if_applied(session, renderer, out, fetch)?,
                DeleteOutcome::Failed => {}
            }
        }
        ShellCommand::Cancel => {
            session.create.close();
            session.edit.close();
        }
        ShellCommand::Help => writeln!(out, "{HELP}")?,
        ShellCommand::Quit => {}
    }
    Ok(())
}

fn show_if_applied<A: TaskApi, W: Write>(
    session: &Session<A>,
    renderer: &Renderer,
    out: &mut W,
    outcome: FetchOutcome,
) -> anyhow::Result<()> {
    match outcome {
        FetchOutcome::Applied | FetchOutcome::Skipped => write_page(session, renderer, out),
        FetchOutcome::Stale | FetchOutcome::Failed => Ok(()),
    }
}

fn write_page<A: TaskApi, W: Write>(
    session: &Session<A>,
    renderer: &Renderer,
    out: &mut W,
) -> anyhow::Result<()> {
    renderer.write_task_page(
        out,
        session.list.tasks(),
        session.list.pagination(),
        session.list.sort(),
    )
}

#[cfg(test)]
mod tests {
    use super::{ShellCommand, parse_line, split_words};
    use crate::api::SortOrder;
    use crate::filter::FilterField;
    use crate::form::FormField;

    #[test]
    fn quoted_values_stay_together() {
        let words = split_words(r#"new title="Buy milk" status=pending"#).expect("split");
        assert_eq!(words, vec!["new", "title=Buy milk", "status=pending"]);
        assert!(split_words(r#"new title="open"#).is_err());
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("   \n").expect("parse"), None);
    }

    #[test]
    fn parses_filter_and_form_assignments() {
        assert_eq!(
            parse_line("filter title=milk status=").expect("parse"),
            Some(ShellCommand::Filter(vec![
                (FilterField::Title, "milk".to_string()),
                (FilterField::Status, String::new()),
            ]))
        );
        assert_eq!(
            parse_line(r#"edit 7 description="two words""#).expect("parse"),
            Some(ShellCommand::Edit(
                7,
                vec![(FormField::Description, "two words".to_string())]
            ))
        );
    }

    #[test]
    fn parses_sort_with_and_without_direction() {
        assert_eq!(
            parse_line("sort date").expect("parse"),
            Some(ShellCommand::Sort {
                field: "date".to_string(),
                order: None
            })
        );
        assert_eq!(
            parse_line("sort title desc").expect("parse"),
            Some(ShellCommand::Sort {
                field: "title".to_string(),
                order: Some(SortOrder::Desc)
            })
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_line("page").is_err());
        assert!(parse_line("page two").is_err());
        assert!(parse_line("delete x").is_err());
        assert!(parse_line("filter priority=high").is_err());
        assert!(parse_line("frobnicate").is_err());
    }
}
