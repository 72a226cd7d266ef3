//! selenium-launcher - Selenium Standalone server around a test run
//!
//! This is the main entry point. It wires together:
//! - Configuration loading and CLI overrides
//! - The `selenium-standalone` installer/runner
//! - Host termination signals (SIGINT/SIGTERM always stop the server)
//! - The server supervisor
//! - The test command, which receives the resolved capabilities

use anyhow::{Context, Result};
use clap::Parser;
use selenium_api::{Capability, RunFlags, TerminationEvent};
use selenium_config::{load_config, LauncherConfig};
use selenium_core::SeleniumLauncher;
use selenium_host_api::StopHandler;
use selenium_host_linux::{CommandInstaller, ProcessSignals, INTERRUPT_EXIT_CODE};
use selenium_util::{default_config_path, SELENIUM_CONFIG_ENV};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable carrying the resolved capabilities (JSON) to the test command
const CAPABILITIES_ENV: &str = "SELENIUM_CAPABILITIES";

/// How long shutdown waits for server output to reach the log file
const LOG_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Exit status used after handling SIGTERM (128 + SIGTERM)
const TERMINATE_EXIT_CODE: i32 = 143;

/// selenium-launcher - run a local Selenium server around a test command
#[derive(Parser, Debug)]
#[command(name = "selenium-launcher")]
#[command(about = "Run a local Selenium Standalone server around a test command", long_about = None)]
struct Args {
    /// Configuration file path (default: ./selenium-launcher.toml if present)
    #[arg(short, long, env = SELENIUM_CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Keep the server running until interrupted
    #[arg(short, long)]
    watch: bool,

    /// Start the server without running the installer
    #[arg(long)]
    skip_install: bool,

    /// Directory for the server log file (overrides config)
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Write the resolved capabilities as JSON to this file
    #[arg(long)]
    capabilities_out: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Test command to run once the server is up
    #[arg(last = true)]
    command: Vec<String>,
}

fn load(args: &Args) -> Result<LauncherConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let path = default_config_path();
            if !path.exists() {
                info!("No config file, using defaults");
                return Ok(LauncherConfig::default());
            }
            path
        }
    };

    let config = load_config(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    info!(
        config_path = %path.display(),
        capabilities = config.capabilities.len(),
        "Configuration loaded"
    );

    Ok(config)
}

async fn run_test_command(command: &[String], capabilities: &str) -> Result<ExitCode> {
    let Some((program, rest)) = command.split_first() else {
        return Ok(ExitCode::SUCCESS);
    };

    info!(command = %command.join(" "), "Running test command");

    let status = Command::new(program)
        .args(rest)
        .env(CAPABILITIES_ENV, capabilities)
        .status()
        .await
        .with_context(|| format!("Failed to run {}", program))?;

    info!(status = %status, "Test command finished");

    Ok(match status.code() {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}

fn export_capabilities(args: &Args, capabilities: &[Capability]) -> Result<String> {
    let json = serde_json::to_string(capabilities).context("Failed to serialize capabilities")?;

    if let Some(path) = &args.capabilities_out {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write capabilities to {:?}", path))?;
        info!(path = %path.display(), "Capabilities written");
    }

    Ok(json)
}

/// Stop the server and exit when the launcher is interrupted or terminated.
///
/// The server runs in its own process group, so terminal signals reach only
/// the launcher and the test command.
fn stop_on_termination(stop: StopHandler) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;

    tokio::spawn(async move {
        let code = tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, stopping Selenium server");
                INTERRUPT_EXIT_CODE
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, stopping Selenium server");
                TERMINATE_EXIT_CODE
            }
        };
        stop();
        std::process::exit(code);
    });

    Ok(())
}

async fn run(args: Args, signals: Arc<ProcessSignals>) -> Result<ExitCode> {
    let args = &args;
    let mut config = load(args)?;

    if args.skip_install {
        config.options = config.options.with_skip_install(true);
    }
    if args.log_path.is_some() {
        config.options = config.options.with_log_path(args.log_path.clone());
    }

    let installer = Arc::new(CommandInstaller::new(config.installer_command.clone()));
    let mut launcher = SeleniumLauncher::new(config.options.clone(), installer, signals);
    let mut capabilities = config.capabilities.clone();

    stop_on_termination(launcher.stop_handler())?;

    if let Err(e) = launcher
        .on_prepare(&mut capabilities, RunFlags { watch: args.watch })
        .await
    {
        launcher.on_complete();
        return Err(e).context("Failed to prepare Selenium server");
    }

    if let Some(path) = launcher.log_file() {
        info!(path = %path.display(), "Selenium server log");
    }

    let outcome = match export_capabilities(args, &capabilities) {
        Ok(json) => run_test_command(&args.command, &json).await,
        Err(e) => Err(e),
    };

    if args.watch {
        if let Err(e) = &outcome {
            warn!(error = %e, "Test command failed");
        }
        info!("Watch mode: Selenium server keeps running until interrupted");
        // The SIGINT handler stops the server and exits the process
        std::future::pending::<()>().await;
    }

    launcher.shutdown(LOG_FLUSH_TIMEOUT).await;
    outcome
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "selenium-launcher starting"
    );

    let signals = Arc::new(ProcessSignals::new());
    let result = signals
        .run_guarded(run(args, signals.clone()))
        .await
        .context("Launcher task failed")
        .and_then(|result| result);

    signals.notify(TerminationEvent::Exit);

    if let Err(e) = &result {
        error!(error = %e, "selenium-launcher failed");
    }
    result
}
