mod cli;
mod commands;
mod completions;
mod error;
mod output;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use keysmith_core::paths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        completions::generate_completions(shell);
        return;
    }

    let _guard = match init_logging(cli.verbose) {
        Ok(guard) => guard,
        Err(err) => error::handle_error(err),
    };

    if let Err(err) = commands::run(&cli) {
        error::handle_error(err);
    }
}

/// Log to a daily file in the keysmith log directory, never to stdout.
fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = paths::ensure_logs_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "keysmith.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}
