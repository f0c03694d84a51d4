pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod notice;
pub mod persistence;
pub mod render;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting slate"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  // An unusable directory is reported by
  // the persistence probe, not here.
  let storage =
    storage::FileStorage::open(
      &data_dir
    )
    .unwrap_or_else(|err| {
      warn!(
        dir = %data_dir.display(),
        error = %format!("{err:#}"),
        "failed to open storage"
      );
      storage::FileStorage::at(&data_dir)
    });

  let persistence =
    persistence::Persistence::open(
      storage,
      cfg.storage_key()
    );
  let mut store =
    store::TaskStore::open(
      persistence,
      clock::SystemClock
    )
    .with_selection(cfg.selection());

  let renderer =
    render::Renderer::new(&cfg)?;

  commands::dispatch(
    &mut store,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
