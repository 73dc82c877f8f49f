// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! sqlbusy - SQLite write-lock contention stress tester.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod run;
mod verify;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use sqlbusy_config::model::SqlbusyConfig;
use sqlbusy_config::{render_errors, ConfigError};

/// sqlbusy - N writers and a deleter contend for one SQLite store.
#[derive(Parser, Debug)]
#[command(name = "sqlbusy", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare the store and run the stress test.
    Run(RunArgs),
    /// Prepare the store (WAL mode, schema) without running workers.
    Init(StoreArgs),
    /// Check persisted rows against the per-worker sequence invariants.
    Verify(VerifyArgs),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
struct StoreArgs {
    /// Load this file instead of the configuration hierarchy.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Database file, overriding `storage.database_path`.
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Total workers, deleters included.
    #[arg(long)]
    workers: Option<u32>,
    /// Inserts per writer transaction.
    #[arg(long)]
    inserts: Option<u64>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
    /// Verify persisted rows after the run.
    #[arg(long)]
    verify: bool,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (store_args, workers, inserts) = match &cli.command {
        Commands::Run(args) => (&args.store, args.workers, args.inserts),
        Commands::Init(args) => (args, None, None),
        Commands::Verify(args) => (&args.store, None, None),
    };

    let config = match load_config(store_args, workers, inserts) {
        Ok(config) => config,
        Err(errors) => {
            render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging.level);

    let result = match cli.command {
        Commands::Run(args) => run::run_stress(&config, args.json, args.verify).await,
        Commands::Init(_) => run::init_store(&config).await.map(|()| true),
        Commands::Verify(args) => verify::run_verify(&config, args.json).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load configuration, apply command-line overrides, and validate the result.
fn load_config(
    args: &StoreArgs,
    workers: Option<u32>,
    inserts: Option<u64>,
) -> Result<SqlbusyConfig, Vec<ConfigError>> {
    let mut config = match &args.config {
        Some(path) => sqlbusy_config::load_and_validate_path(path)?,
        None => sqlbusy_config::load_and_validate()?,
    };

    if let Some(database) = &args.database {
        config.storage.database_path = database.display().to_string();
    }
    if let Some(workers) = workers {
        config.workload.workers = workers;
    }
    if let Some(inserts) = inserts {
        config.workload.inserts_per_writer = inserts;
    }

    sqlbusy_config::validation::validate_config(&config)?;
    Ok(config)
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlbusy={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "sqlbusy", "run", "--workers", "20", "--inserts", "50", "--database", "/tmp/x.db3",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.workers, Some(20));
                assert_eq!(args.inserts, Some(50));
                assert_eq!(args.store.database, Some(PathBuf::from("/tmp/x.db3")));
                assert!(args.json);
                assert!(!args.verify);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["sqlbusy"]).is_err());
    }

    #[test]
    fn overrides_are_applied_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlbusy.toml");
        std::fs::write(&path, "[workload]\nworkers = 4\n").unwrap();
        let args = StoreArgs {
            config: Some(path),
            database: Some(dir.path().join("busy.db3")),
        };

        let config = load_config(&args, None, Some(25)).unwrap();
        assert_eq!(config.workload.workers, 4);
        assert_eq!(config.workload.inserts_per_writer, 25);
        assert!(config.storage.database_path.ends_with("busy.db3"));

        let errors = load_config(&args, Some(0), None).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("workload.workers"))));
    }
}
