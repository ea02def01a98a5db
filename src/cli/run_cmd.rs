use anyhow::{Context, Result};
use tracing::info;

use crate::cli::output::format_interval;
use crate::cli::prompt;
use crate::core::agent::{Agent, ShutdownSignal};
use crate::core::config::{self, ConfigOverrides};
use crate::core::logging;

/// Foreground agent: what the registered service executes.
pub async fn run(overrides: &ConfigOverrides, verbose: bool) -> Result<()> {
    let config = prompt::get_or_create(overrides)?;
    let _log_guard = logging::init_agent(verbose, &config::log_path());
    let projects_dir = config::projects_dir();

    info!("Claude Monitor started");
    info!("  Email: {}", config.email);
    info!("  Server: {}", config.server_url);
    info!("  Interval: {}", format_interval(config.interval_seconds));
    info!("  Projects dir: {}", projects_dir.display());

    let shutdown = ShutdownSignal::install().context("Failed to install signal handlers")?;
    let agent = Agent::new(config, projects_dir)?;

    agent
        .run_until(async move {
            let signal = shutdown.recv().await;
            info!("Received signal: {}", signal);
        })
        .await;
    Ok(())
}
