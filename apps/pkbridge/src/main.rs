//! pkbridge - package engine transactions as job reports
//!
//! Replays recorded engine scripts through the full job pipeline so the
//! report stream a client would see can be inspected, and exposes the
//! configuration and external fetch command for troubleshooting.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use clap::Parser;
use pkbridge_config::{constants, Config};
use pkbridge_events::channel;
use pkbridge_net::{Fetcher, XferCommand};
use pkbridge_transaction::{
    jobs, Engine, JobContext, JobParams, JobRunner, Script, ScriptedEngine, TransFlags,
};
use pkbridge_types::{Role, Status};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, info, warn};

/// Exit code for a job that ran but did not succeed
const EXIT_JOB_FAILED: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    let config = load_config(cli.global.config.as_deref()).await;
    let level = config
        .as_ref()
        .map_or(constants::DEFAULT_LOG_LEVEL, |config| {
            config.general.log_level.as_str()
        });
    logging::init_tracing(json_mode, cli.global.debug, level);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_JOB_FAILED),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Load the configuration file, apply `PKBRIDGE_*` overrides and validate
async fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(path).await?;
    config.merge_env()?;
    config.validate()?;
    Ok(config)
}

/// Main application logic; returns whether the command succeeded
async fn run(cli: Cli, config: Config) -> Result<bool, CliError> {
    info!("Starting pkbridge v{}", env!("CARGO_PKG_VERSION"));
    let renderer = OutputRenderer::new(cli.global.json);

    match cli.command {
        Commands::Replay {
            script,
            role,
            files,
            only_trusted,
            directory,
            cancel_after,
        } => {
            let params = JobParams::new()
                .with_full_paths(files)
                .with_only_trusted(only_trusted)
                .with_directory(directory);
            replay(&script, role, params, cancel_after, config, &renderer).await
        }
        Commands::Fetch { url, dir, force } => {
            let path = fetch(url, dir, force, &config).await?;
            renderer.render_fetched(&path)?;
            Ok(true)
        }
        Commands::CheckConfig => {
            let source = match cli.global.config {
                Some(path) => Some(path),
                None => Config::default_path().ok().filter(|path| path.exists()),
            };
            renderer.render_config(&config, source.as_deref())?;
            Ok(true)
        }
    }
}

async fn replay(
    script: &Path,
    role: Role,
    params: JobParams,
    cancel_after: Option<usize>,
    config: Config,
    renderer: &OutputRenderer,
) -> Result<bool, CliError> {
    if matches!(role, Role::InstallFiles | Role::SimulateInstallFiles) && params.full_paths.is_empty()
    {
        return Err(CliError::InvalidArguments(format!(
            "{role} jobs need at least one --file"
        )));
    }

    let script = Script::load(script).await?;
    let runner = JobRunner::new();
    let (tx, mut rx) = channel();
    let context = runner.job(role, params, tx);
    debug!(job = %context.job_id(), %role, "replaying script");

    let handle = runner.start(context, Status::Setup, move |context| {
        let mut engine =
            ScriptedEngine::new(script).with_fetch_dir(config.transaction.cache_dir.clone());
        run_job(&mut engine, &context, &config)
    });

    let mut seen = 0;
    while let Some(message) = rx.recv().await {
        logging::log_event_with_tracing(&message);
        renderer.render_event(&message)?;

        seen += 1;
        if cancel_after == Some(seen) {
            match runner.cancel() {
                Ok(true) => info!(after = seen, "cancellation requested"),
                Ok(false) => {}
                Err(e) => warn!("could not cancel: {e}"),
            }
        }
    }

    Ok(handle.await?)
}

/// Pick the worker body for the job's role
fn run_job<E: Engine + ?Sized>(engine: &mut E, context: &JobContext, config: &Config) -> bool {
    match context.role() {
        Role::InstallFiles => jobs::install_files(engine, context, config),
        Role::SimulateInstallFiles => jobs::simulate_install_files(engine, context, config),
        Role::DownloadPackages => {
            jobs::commit_queued(engine, context, config, TransFlags::DOWNLOAD_ONLY)
        }
        Role::InstallPackages | Role::UpdatePackages | Role::RemovePackages => {
            jobs::commit_queued(engine, context, config, TransFlags::empty())
        }
    }
}

async fn fetch(
    url: String,
    dir: Option<PathBuf>,
    force: bool,
    config: &Config,
) -> Result<PathBuf, CliError> {
    let command = config.transaction.xfer_command.clone().ok_or_else(|| {
        CliError::InvalidArguments("no xfer_command is configured".to_string())
    })?;
    let fetcher = XferCommand::new(command)?;
    let dir = dir.unwrap_or_else(|| config.transaction.cache_dir.clone());

    let path = tokio::task::spawn_blocking(move || fetcher.fetch(&url, &dir, force)).await??;
    Ok(path)
}
