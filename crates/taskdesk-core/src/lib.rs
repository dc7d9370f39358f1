pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod form;
pub mod list;
pub mod render;
pub mod session;
pub mod shell;
pub mod task;
pub mod ui;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskdesk CLI"
  );
  debug!(?cli.rc_overrides, "rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  cfg.apply_env_overrides(|key| {
    std::env::var(key).ok()
  });
  if let Some(url) = cli.api_url {
    cfg.apply_overrides([(
      "api.url".to_string(),
      url
    )]);
  }

  let api = Arc::new(
    api::HttpTaskApi::from_config(&cfg)
      .context(
        "failed to set up the task \
         service client"
      )?
  );
  let notifier: Arc<dyn ui::Notifier> =
    Arc::new(
      ui::TerminalNotifier::stderr(
        cfg.color()
      )
    );
  let mut session =
    session::Session::new(
      api, notifier, &cfg
    )?;
  let renderer =
    render::Renderer::new(&cfg);

  let command =
    cli.command.unwrap_or_else(|| {
      cli::Command::List(
        cli::ListArgs::default()
      )
    });

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  runtime.block_on(commands::dispatch(
    &mut session,
    &renderer,
    command
  ))?;

  info!("done");
  Ok(())
}
