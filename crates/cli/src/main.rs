use crate::{
    commands::{Commands, ConfigArgs, RunArgs},
    conn::{ConnectionPinger, PostgresConnectionPinger},
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use chrono::Utc;
use clap::Parser;
use connectors::{
    source::{FixtureSource, PgSource},
    target::SledTarget,
};
use engine_config::settings::{self, MigrationSettings, SettingsBuilder, SettingsValidator};
use engine_core::{
    connectors::source::SourceStore,
    state::{JobRepository, sled_store::SledJobRepository},
};
use engine_runtime::execution::JobExecutionTracker;
use model::execution::job::{JobExecution, JobParameters};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "shelfmover",
    version = "0.1.0",
    about = "Migrates a relational library catalogue into a document store"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli.command, &shutdown).await {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "Command failed");
            eprintln!("Error: {err}");
            ExitCode::GeneralError
        }
    };

    if shutdown.is_shutdown_requested() {
        return ExitCode::ShutdownRequested.into();
    }
    code.into()
}

async fn run(command: Commands, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    match command {
        Commands::Migrate { config, run } => {
            let tracker = open_tracker(&config, &run, shutdown).await?;
            let execution = tracker.start(JobParameters::stamped(Utc::now())).await?;
            Ok(report(&execution))
        }
        Commands::Restart { config, run } => {
            let tracker = open_tracker(&config, &run, shutdown).await?;
            let job_name = tracker.settings().job_name.clone();
            let execution = tracker.restart_last(&job_name).await?;
            Ok(report(&execution))
        }
        Commands::Status {
            config,
            limit,
            json,
        } => {
            let settings = load_settings(&config, SettingsBuilder::new())?;
            let repository = open_repository(&config)?;
            let executions = repository_history(repository, &settings, limit).await?;
            if json {
                output::print_history_json(&executions)?;
            } else {
                output::print_history_table(&settings.job_name, &executions);
            }
            Ok(ExitCode::Success)
        }
        Commands::TestConn { pg_url } => {
            PostgresConnectionPinger { conn_str: pg_url }.ping().await?;
            println!("Connection OK");
            Ok(ExitCode::Success)
        }
    }
}

fn report(execution: &JobExecution) -> ExitCode {
    output::print_finished(execution);
    ExitCode::for_status(execution.status)
}

/// Defaults, then environment (and `--env-file`), then explicit flags.
fn load_settings(config: &ConfigArgs, flags: SettingsBuilder) -> Result<MigrationSettings, CliError> {
    let mut vars = EnvManager::from_system();
    if let Some(path) = &config.env_file {
        vars.load_from_file(path)?;
    }

    let mut flags = flags;
    if let Some(name) = &config.job_name {
        flags = flags.job_name(name.clone());
    }

    let layered = SettingsBuilder::new()
        .overlay(settings::env::from_vars(vars.all())?)
        .overlay(flags);
    Ok(SettingsValidator::validate(layered)?)
}

fn state_dir(config: &ConfigArgs) -> Result<PathBuf, CliError> {
    match &config.state_dir {
        Some(dir) => Ok(dir.clone()),
        None => dirs::home_dir()
            .map(|home| home.join(".shelfmover/state"))
            .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into())),
    }
}

fn open_repository(config: &ConfigArgs) -> Result<Arc<SledJobRepository>, CliError> {
    let path = state_dir(config)?;
    let repository = SledJobRepository::open(&path).map_err(|err| {
        CliError::Unexpected(format!(
            "Failed to open job state at {}: {err}",
            path.display()
        ))
    })?;
    Ok(Arc::new(repository))
}

async fn repository_history(
    repository: Arc<SledJobRepository>,
    settings: &MigrationSettings,
    limit: Option<usize>,
) -> Result<Vec<JobExecution>, CliError> {
    let limit = limit.unwrap_or(settings.history_limit);
    Ok(repository.list_executions(&settings.job_name, limit).await?)
}

async fn open_source(run: &RunArgs, chunk_size: usize) -> Result<Arc<dyn SourceStore>, CliError> {
    match (&run.fixture, &run.pg_url) {
        (Some(path), _) => Ok(Arc::new(FixtureSource::load(path).await?)),
        (None, Some(url)) => Ok(Arc::new(PgSource::connect(url, chunk_size).await?)),
        (None, None) => Err(CliError::Config(
            "either --fixture or --pg-url is required".to_string(),
        )),
    }
}

async fn open_tracker(
    config: &ConfigArgs,
    run: &RunArgs,
    shutdown: &ShutdownCoordinator,
) -> Result<JobExecutionTracker, CliError> {
    let mut flags = SettingsBuilder::new();
    if let Some(size) = run.chunk_size {
        flags = flags.chunk_size(size);
    }
    if let Some(mode) = run.write_mode {
        flags = flags.write_mode(mode);
    }
    let settings = load_settings(config, flags)?;

    let repository = open_repository(config)?;
    let source = open_source(run, settings.chunk_size).await?;
    let target = Arc::new(SledTarget::open(&run.target_dir)?);

    info!(
        source = %source.describe(),
        target = %run.target_dir.display(),
        "Opened stores"
    );

    Ok(
        JobExecutionTracker::new(repository, source, target, settings)
            .with_cancel(shutdown.cancel_token()),
    )
}
