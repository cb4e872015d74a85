// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use palette::deploy::DeployStrategy;
use palette::output::OutputMode;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "palette")]
#[command(about = "Blue-green deployments for Marathon applications behind Marathon-LB")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new palette.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Deploy application definitions
    Deploy {
        /// Rendered application definition (JSON); repeat for several files
        #[arg(short, long = "template", value_name = "FILE", required = true)]
        templates: Vec<PathBuf>,

        /// Deployment strategy (overrides config)
        #[arg(short, long, value_enum)]
        strategy: Option<DeployStrategy>,

        /// Per-application deadline, e.g. 10m or 90s (overrides config)
        #[arg(long, value_parser = parse_timeout)]
        timeout: Option<Duration>,

        /// Skip the confirmation prompt and force the scheduler update
        #[arg(short, long)]
        force: bool,

        /// Validate and allocate only; print the definitions without deploying
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputMode::Normal)]
        output: OutputMode,
    },
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let timeout =
        humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if timeout.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(timeout)
}
