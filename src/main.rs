use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::fs::{self, File};
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, warn, Level};
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

mod cli;
mod commands;
mod config;
mod error;
mod executor;
mod models;
mod orchestrator;
mod registry;
mod resolver;
mod validate;

use cli::Cli;
use commands::SessionEnv;
use config::{AppConfig, ConfigManager};
use executor::{Console, Executor, ProcessRunner};
use models::Invocation;
use orchestrator::Orchestrator;
use registry::{MemoryStore, PassStore, Registry, SecretStore};

const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => Ok(ConfigManager::with_file(path)),
        None => ConfigManager::new(),
    };
    let (manager, config) = match manager.and_then(|m| m.load_config().map(|c| (m, c))) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = init_logging(&config, derive_level(cli.verbose, cli.quiet)) {
        eprintln!("Error: failed to set up logging: {err:#}");
        return ExitCode::from(1);
    }
    debug!("Config: {:?} ({:?})", config, manager.config_path());

    if cli.write_config {
        return match manager.save_config(&config) {
            Ok(()) => {
                println!("{}", manager.config_path().display());
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Error: {err:#}");
                ExitCode::from(1)
            }
        };
    }

    let invocation = cli.invocation();
    run_until_interrupted(run(&config, &invocation), tokio::signal::ctrl_c()).await
}

/// Drives `work` to an exit code unless `interrupt` fires first. Dropping
/// `work` on interrupt kills a running child.
async fn run_until_interrupted<W, I>(work: W, interrupt: I) -> ExitCode
where
    W: Future<Output = Result<i32>>,
    I: Future<Output = io::Result<()>>,
{
    tokio::pin!(work);
    let result = tokio::select! {
        result = &mut work => result,
        signal = interrupt => match signal {
            Ok(()) => {
                eprintln!();
                eprintln!("Operation is interrupted by user");
                return ExitCode::from(INTERRUPTED);
            }
            Err(err) => {
                warn!("Failed to listen for interrupts: {err}");
                work.await
            }
        },
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(config: &AppConfig, invocation: &Invocation) -> Result<i32> {
    match &config.store.hosts_file {
        Some(path) => {
            let store = MemoryStore::from_hosts_file(path, &config.store.prefix)?;
            run_with(config, store, invocation).await
        }
        None => run_with(config, PassStore::new(&config.store.program), invocation).await,
    }
}

async fn run_with<S: SecretStore>(
    config: &AppConfig,
    store: S,
    invocation: &Invocation,
) -> Result<i32> {
    let registry = Registry::new(store, &config.store.prefix);
    let executor = Executor::new(ProcessRunner, Console::stdio(), invocation.dry_run);
    let session = SessionEnv::from_term(std::env::var("TERM").ok(), &config.defaults.ssh_term);

    Orchestrator::new(config, registry, executor, session)
        .run(invocation)
        .await
}

fn derive_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Stderr by default; a timestamped file under `log_dir` when configured.
fn init_logging(config: &AppConfig, level: Level) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    match &config.log_dir {
        Some(log_dir) => {
            let file = File::create(log_file_path(log_dir)?)?;
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(file)
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn log_file_path(log_dir: &Path) -> Result<std::path::PathBuf> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }
    Ok(log_dir.join(format!(
        "remote_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    )))
}
