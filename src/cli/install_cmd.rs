use anyhow::Result;
use colored::{control, Colorize};

use crate::cli::output::{format_interval, OutputOptions};
use crate::cli::prompt;
use crate::core::config::{self, ConfigOverrides};
use crate::core::service;

pub async fn install(overrides: &ConfigOverrides, opts: &OutputOptions) -> Result<()> {
    control::set_override(opts.use_color);
    let backend = service::backend()?;
    let config = prompt::get_or_create(overrides)?;

    println!("Installing Claude Monitor service...");
    println!("  Email: {}", config.email);
    println!("  Server: {}", config.server_url);
    println!("  Interval: {}", format_interval(config.interval_seconds));

    let binary = service::install_binary(&config::installed_binary_path())?;
    let log_path = config::log_path();
    backend.install(&binary, &log_path).await?;

    println!();
    println!("{}", "Service installed successfully!".green().bold());
    println!("The monitor will start automatically on login.");
    println!("Log file: {}", log_path.display());
    Ok(())
}

pub async fn uninstall(opts: &OutputOptions) -> Result<()> {
    control::set_override(opts.use_color);
    let backend = service::backend()?;

    println!("Uninstalling Claude Monitor service...");
    backend.uninstall().await?;
    println!("{}", "Service uninstalled successfully!".green().bold());
    Ok(())
}
