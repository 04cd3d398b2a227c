pub mod calendar;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod conflict;
pub mod datastore;
pub mod period;
pub mod render;
pub mod scheduler;
pub mod status;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting punchcard CLI"
    );

    let mut cfg = config::Config::load(cli.punchcardrc.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    debug!(data_dir = %data_dir.display(), "resolved data directory");

    let mut store = datastore::RosterStore::open(&data_dir)
        .with_context(|| format!("failed to open roster store at {}", data_dir.display()))?;

    let mut renderer = render::Renderer::new(&cfg)?;

    commands::dispatch(&mut store, &cfg, &mut renderer, cli.command, Utc::now())?;

    info!("done");
    Ok(())
}
