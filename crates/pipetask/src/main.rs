//! pipetask - pipeline agent tasks
//!
//! Host commands go to stdout; logs go to stderr.

mod cli;
mod commands;

use clap::Parser;
use pipetask_core::host::{HostChannel, StdoutChannel, TaskResult};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet, system_debug());

    let host: Arc<dyn HostChannel> = Arc::new(StdoutChannel::new());
    let config_dir = cli.config_dir.as_deref();

    let result = match cli.command {
        Commands::UsePythonVersion(args) => {
            commands::use_python_version::run(args, config_dir, host.clone()).await
        }
        Commands::Maven(args) => commands::maven::run(args, config_dir, host.clone()).await,
        Commands::TestInvoker(args) => {
            commands::test_invoker::run(args, config_dir, host.clone()).await
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            host.complete(TaskResult::Failed, &format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// `System.Debug` set on the pipeline run
fn system_debug() -> bool {
    std::env::var("SYSTEM_DEBUG").is_ok_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool, debug: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match (verbose, debug) {
            (0, false) => EnvFilter::new("info"),
            (0, true) | (1, _) => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
