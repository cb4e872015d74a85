// ABOUTME: Entry point for the palette CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::DeployRequest;
use palette::config::{self, Config};
use palette::error::Result;
use palette::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = match &cli.command {
        Commands::Deploy { output, .. } => *output,
        Commands::Init { .. } => OutputMode::Normal,
    };

    if let Err(e) = run(cli).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => {
            config::init_config(&cwd, force)?;
            println!("Created {}", config::CONFIG_FILENAME);
            Ok(())
        }
        Commands::Deploy {
            templates,
            strategy,
            timeout,
            force,
            dry_run,
            output,
        } => {
            let config = Config::discover(&cwd)?;
            let request = DeployRequest {
                templates,
                strategy,
                timeout,
                force,
                dry_run,
            };
            commands::deploy(config, request, Output::new(output)).await
        }
    }
}
