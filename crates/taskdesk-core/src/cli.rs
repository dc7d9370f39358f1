use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::api::SortOrder;
use crate::datetime::parse_user_date;
use crate::task::{Status, TaskId};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdesk",
    version,
    about = "List, filter and edit tasks held by a remote task service",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the task service; wins over config and environment.
    #[arg(long = "api-url")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show one page of tasks (the default).
    List(ListArgs),
    /// Create a task.
    Add(AddArgs),
    /// Change fields of an existing task.
    Edit(EditArgs),
    /// Delete a task after confirmation.
    Delete(DeleteArgs),
    /// Interactive session keeping filters, sort and page between commands.
    Shell,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    #[arg(long, value_parser = parse_status_arg)]
    pub status: Option<Status>,

    #[arg(long)]
    pub page: Option<u32>,

    #[arg(long = "per-page")]
    pub per_page: Option<u32>,

    #[arg(long = "sort-by")]
    pub sort_by: Option<String>,

    #[arg(long = "sort-order", value_parser = parse_sort_order_arg)]
    pub sort_order: Option<SortOrder>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    #[arg(long, value_parser = parse_status_arg, default_value = "pending")]
    pub status: Status,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: TaskId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// New date; an empty value removes it.
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long, value_parser = parse_status_arg)]
    pub status: Option<Status>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub id: TaskId,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_user_date(s).map_err(|err| err.to_string())
}

fn parse_status_arg(s: &str) -> Result<Status, String> {
    s.parse::<Status>().map_err(|err| err.to_string())
}

fn parse_sort_order_arg(s: &str) -> Result<SortOrder, String> {
    s.parse::<SortOrder>().map_err(|err| err.to_string())
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
