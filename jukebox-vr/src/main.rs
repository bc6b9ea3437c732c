//! Jukebox console - Main entry point
//!
//! Loads the clip configuration, runs the jukebox on the simulated backend
//! and reads one command per line from stdin until `quit`, end of input or
//! a termination signal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jukebox_common::config::{resolve_config_path, JukeboxConfig, CONFIG_ENV_VAR};
use jukebox_common::SessionClock;
use jukebox_vr::backend::SimulatedBackend;
use jukebox_vr::console::{self, Command};
use jukebox_vr::Jukebox;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for jukebox-vr
#[derive(Parser, Debug)]
#[command(name = "jukebox-vr")]
#[command(about = "Vertical-remix music jukebox")]
#[command(version)]
struct Args {
    /// Path to the TOML clip configuration
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (overrides the config file)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR)
        .context("No configuration file found")?;
    let config = JukeboxConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // Initialize tracing
    let default_filter = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("jukebox_vr={0},jukebox_common={0}", config.logging.level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jukebox with {}", config_path.display());

    let clock = SessionClock::start();
    let backend = SimulatedBackend::new(config.clip_catalog(), clock);
    let jukebox = Arc::new(
        Jukebox::new(&backend, &config, clock).context("Failed to initialize jukebox")?,
    );
    jukebox.start().await.context("Failed to start jukebox")?;

    println!("{}", console::HELP);

    tokio::select! {
        result = run_console(Arc::clone(&jukebox)) => result?,
        _ = shutdown_signal() => {}
    }

    jukebox.shutdown().await;
    info!("Jukebox shutdown complete");
    Ok(())
}

/// Read and execute commands until `quit` or end of input
async fn run_console(jukebox: Arc<Jukebox>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match console::parse_line(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match console::execute(&jukebox, command).await {
            Ok(message) => println!("{}", message),
            Err(e) => warn!("{:?} failed: {}", command, e),
        }

        if command == Command::Quit {
            break;
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
