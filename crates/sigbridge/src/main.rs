//! The sigbridge service binary.
//!
//! ```bash
//! sigbridge --config sigbridge.toml --port 8080
//! ```
//!
//! Runs until Ctrl+C (or SIGTERM on Unix), then stops the supervisor.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sigbridge::prelude::*;

// Adapters register at link time; keep the built-in ones linked in.
#[cfg(feature = "memory-adapter")]
use sigbridge::memory as _;

#[derive(Debug, Parser)]
#[command(name = "sigbridge", version, about)]
struct Args {
    /// Configuration file. Without it, `sigbridge.*` is searched for in the
    /// working directory and the user configuration directory.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port of the management endpoint.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Configuration profile (`development`, `production`, ...).
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,
}

impl Args {
    fn config_loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile(profile);
        }
        loader
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let supervisor = Supervisor::new(args.config_loader());

    supervisor
        .start(args.port)
        .await
        .context("failed to start sigbridge")?;

    if let Some(addr) = supervisor.management_addr() {
        info!(%addr, "sigbridge running, press Ctrl+C to stop");
    }

    shutdown_signal().await?;
    info!("Shutdown requested");

    supervisor.stop().await.context("failed to stop sigbridge")?;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
