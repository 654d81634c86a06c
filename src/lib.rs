pub mod cli;
pub mod config;
pub mod db;
pub mod diagnostic;
pub mod errors;
pub mod models;
pub mod redaction;

use crate::cli::Cli;
use crate::config::ToolConfig;
use crate::diagnostic::LineConsole;
use anyhow::Context;
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    // dropped when run() returns, which flushes the file writer
    let log_guard = match init_tracing(&config) {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("warning: logging disabled: {:#}", error);
            None
        }
    };

    let repo = config.repository();
    let mut console = LineConsole::stdio();
    match cli::dispatch(&cli.command, &repo, &mut console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // stderr logging would repeat the message printed below
            if log_guard.is_some() {
                tracing::error!(command = cli.command.name(), error = %error, "command failed");
            }
            eprintln!("error: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &ToolConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let Some(log_dir) = &config.log_dir else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| anyhow::anyhow!(error))
            .context("installing stderr subscriber")?;
        return Ok(None);
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "armaguard-settings.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| anyhow::anyhow!(error))
        .context("installing file subscriber")?;
    Ok(Some(guard))
}
