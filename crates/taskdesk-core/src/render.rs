use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::api::{Pagination, Sort, SortOrder};
use crate::config::Config;
use crate::datetime::format_display_date;
use crate::error::FieldErrors;
use crate::filter::{FilterState, TaskFilter};
use crate::task::{Task, TaskDraft};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self::with_color(cfg.color() && io::stdout().is_terminal())
    }

    pub fn with_color(color: bool) -> Self {
        Self { color }
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn print_task_page(
        &self,
        tasks: &[Task],
        pagination: Pagination,
        sort: &Sort,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_page(&mut out, tasks, pagination, sort)
    }

    pub fn write_task_page<W: Write>(
        &self,
        mut out: W,
        tasks: &[Task],
        pagination: Pagination,
        sort: &Sort,
    ) -> anyhow::Result<()> {
        let headers = [
            ("id", "ID"),
            ("title", "Título"),
            ("description", "Descrição"),
            ("date", "Data"),
            ("status", "Status"),
        ]
        .into_iter()
        .map(|(field, label)| {
            if field == sort.by {
                let arrow = match sort.order {
                    SortOrder::Asc => "▲",
                    SortOrder::Desc => "▼",
                };
                format!("{label} {arrow}")
            } else {
                label.to_string()
            }
        })
        .collect::<Vec<_>>();

        let rows: Vec<Vec<String>> = tasks
            .iter()
            .map(|task| {
                let code = task.status.color().ansi_code();
                [
                    task.id.to_string(),
                    task.title.clone(),
                    task.description.clone(),
                    task.date.map(format_display_date).unwrap_or_default(),
                    task.status.label().to_string(),
                ]
                .into_iter()
                .map(|cell| self.paint(&cell, code))
                .collect()
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        writeln!(
            out,
            "Página {} de {} · {} tarefa(s) · {} por página",
            pagination.current_page, pagination.last_page, pagination.total, pagination.per_page
        )?;
        Ok(())
    }

    pub fn write_task<W: Write>(&self, mut out: W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "título      {}", task.title)?;
        writeln!(out, "descrição   {}", task.description)?;
        writeln!(
            out,
            "data        {}",
            task.date.map(format_display_date).unwrap_or_default()
        )?;
        writeln!(
            out,
            "status      {}",
            self.paint(task.status.label(), task.status.color().ansi_code())
        )?;
        Ok(())
    }

    pub fn write_draft<W: Write>(&self, mut out: W, draft: &TaskDraft) -> anyhow::Result<()> {
        writeln!(out, "título      {}", draft.title)?;
        writeln!(out, "descrição   {}", draft.description)?;
        writeln!(
            out,
            "data        {}",
            draft.date.map(format_display_date).unwrap_or_default()
        )?;
        writeln!(out, "status      {}", draft.status.label())?;
        Ok(())
    }

    /// Inline validation output: first message per field.
    pub fn write_field_errors<W: Write>(
        &self,
        mut out: W,
        errors: &FieldErrors,
    ) -> anyhow::Result<()> {
        for (field, message) in errors.firsts() {
            writeln!(out, "  {}: {}", self.paint(field, "31"), message)?;
        }
        Ok(())
    }

    pub fn write_filters<W: Write>(
        &self,
        mut out: W,
        draft: &FilterState,
        applied: &TaskFilter,
    ) -> anyhow::Result<()> {
        let date = |d: Option<chrono::NaiveDate>| d.map(format_display_date).unwrap_or_default();
        writeln!(
            out,
            "rascunho    título={:?} data={} status={}",
            draft.title(),
            date(draft.date()),
            draft.status().map(|s| s.as_str()).unwrap_or_default()
        )?;
        writeln!(
            out,
            "aplicado    título={:?} data={} status={}",
            applied.title.as_deref().unwrap_or_default(),
            date(applied.date),
            applied.status.as_ref().map(|s| s.as_str()).unwrap_or_default()
        )?;
        if draft.has_active_filters() {
            writeln!(out, "(use `reset` para limpar os filtros)")?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let pad = |cell: &str, width: usize| {
        let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
        format!("{cell}{} ", " ".repeat(width.saturating_sub(visible)))
    };

    let header_line: String = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad(header, *width))
        .collect();
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule: String = widths.iter().map(|&width| format!("{:-<width$} ", "")).collect();
    writeln!(writer, "{}", rule.trim_end())?;

    for row in rows {
        let line: String = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect();
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::Renderer;
    use crate::api::{Pagination, Sort, SortOrder};
    use crate::task::{Status, Task};

    fn task(id: u64, title: &str, status: Status) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            status,
        }
    }

    fn render(renderer: &Renderer, tasks: &[Task]) -> String {
        let mut out = Vec::new();
        renderer
            .write_task_page(
                &mut out,
                tasks,
                Pagination {
                    current_page: 1,
                    last_page: 3,
                    per_page: 10,
                    total: 23,
                },
                &Sort {
                    by: "date".to_string(),
                    order: SortOrder::Desc,
                },
            )
            .expect("render page");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn table_shows_labels_dates_and_server_pagination() {
        let text = render(
            &Renderer::with_color(false),
            &[task(1, "Buy milk", Status::Pending), task(2, "Ship it", Status::Completed)],
        );
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("ID"));
        assert!(lines[0].contains("Data ▼"));
        assert!(lines[2].contains("Buy milk"));
        assert!(lines[2].contains("01/01/2024"));
        assert!(lines[2].ends_with("Pendente"));
        assert!(lines[3].ends_with("Concluído"));
        assert_eq!(lines[4], "Página 1 de 3 · 23 tarefa(s) · 10 por página");
    }

    #[test]
    fn rows_are_painted_with_the_status_color() {
        let text = render(
            &Renderer::with_color(true),
            &[task(1, "Buy milk", Status::Pending), task(2, "Odd", Status::Unknown("archived".to_string()))],
        );
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[2].contains("\x1b[31mBuy milk\x1b[0m"));
        assert!(lines[3].contains("\x1b[90mDesconhecido\x1b[0m"));
    }

    #[test]
    fn columns_line_up_without_color_codes() {
        let text = render(
            &Renderer::with_color(true),
            &[task(1, "A", Status::Pending), task(22, "Longer title", Status::InProgress)],
        );
        let plain = super::strip_ansi(&text);
        let lines: Vec<&str> = plain.lines().collect();
        let title_col = lines[0].find("Título").expect("title header");
        assert_eq!(lines[2].find('A'), Some(title_col));
        assert_eq!(lines[3].find("Longer"), Some(title_col));
    }
}
