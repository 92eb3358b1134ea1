mod app;
mod cli;
mod config;
mod effects;
mod persistence;
mod render;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use tracker_core::AppState;
use tracker_engine::EngineHandle;
use tracker_logging::tracker_info;

use crate::app::App;
use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::effects::EffectRunner;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli)?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    tracker_logging::initialize(config.log_destination, level, Path::new("tracker.log"));
    tracker_info!(
        "Starting scrape-tracker base_url={} state_dir={:?}",
        config.client.base_url,
        config.state_dir
    );

    persistence::ensure_state_dir(&config.state_dir)
        .with_context(|| format!("preparing state directory {:?}", config.state_dir))?;

    let state = AppState::new().with_failure_scope(config.failure_scope);

    let engine = EngineHandle::new(config.client.clone())
        .with_context(|| format!("building client for {}", config.client.base_url))?;
    let mut app = App::new(state, EffectRunner::new(engine), config.state_dir);
    app.restore();

    tracker_info!("Restored {} tracked item(s)", app.state().item_count());

    match cli.command {
        Command::Submit { urls, timeout_secs } => {
            app.submit(&urls.join(" "), Duration::from_secs(timeout_secs))?;
            app.print();
        }
        Command::Watch { timeout_secs } => {
            app.watch(timeout_secs.map(Duration::from_secs))?;
        }
        Command::Action {
            id,
            action,
            timeout_secs,
        } => {
            app.request_action(&id, action, Duration::from_secs(timeout_secs))?;
            app.print();
        }
        Command::Status => app.print(),
    }
    Ok(())
}
