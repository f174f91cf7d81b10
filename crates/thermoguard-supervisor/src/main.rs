//! thermoguard - thermal-camera appliance supervisor
//!
//! Runs the SERVER and IR workers, checks their heartbeats and channels, and
//! keeps the safety relay closed only while everything is healthy.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use thermoguard_relay::{RelayBoard, SimulatedBus};
use thermoguard_supervisor::{Supervisor, SupervisorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "thermoguard")]
#[command(about = "Thermal-camera appliance supervisor")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "THERMOGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Override the supervisor loop period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, load_error) = match cli.config.as_deref() {
        Some(path) => match SupervisorConfig::load_from_path(path) {
            Ok(config) => (config, None),
            Err(e) => (SupervisorConfig::default(), Some(e)),
        },
        None => (SupervisorConfig::default(), None),
    };
    if let Some(ms) = cli.tick_ms {
        config.tick_interval_ms = ms;
    }

    init_logging(cli.verbose, &config.log_filter);
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "failed to load config, using defaults");
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "supervisor failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config_filter: &str) {
    let default_filter = match verbose {
        0 => config_filter,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn run(config: SupervisorConfig) -> Result<()> {
    let board = RelayBoard::with_config(SimulatedBus::new(), config.relay)
        .context("failed to open relay board")?;

    let builder = Supervisor::builder(config).output(board).stdin_input();
    let abort = builder.abort_signal();
    if let Err(e) = ctrlc::set_handler(move || abort.set()) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let mut supervisor = builder.build().context("failed to construct supervisor")?;
    supervisor.run().context("supervisor run failed")?;
    tracing::info!(ticks = supervisor.tick_count(), "supervisor exited");
    Ok(())
}
