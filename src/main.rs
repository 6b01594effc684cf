//! bpack - buildpack packaging CLI
//!
//! CLI entry point that dispatches to subcommands.

use bpack::cli::{Cli, Commands};
use bpack::config::{Config, ConfigManager};
use bpack::error::BpackResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config: &Config) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("bpack=warn"),
        1 => EnvFilter::new("bpack=info"),
        _ => EnvFilter::new("bpack=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time();

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run() -> BpackResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config_file {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", manager.path().display());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::PackageBuildpack(args) => {
            bpack::cli::commands::package_buildpack(args, &config, &cancel).await
        }
        Commands::Cache(args) => bpack::cli::commands::cache(args, &config).await,
        Commands::Config(args) => bpack::cli::commands::config(args, &config, &manager).await,
    }
}
