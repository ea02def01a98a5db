use anyhow::Result;
use chrono::{DateTime, Local};
use colored::{control, ColoredString, Colorize};
use std::time::SystemTime;

use crate::cli::output::{format_interval, OutputOptions};
use crate::core::config::{self, MonitorConfig};
use crate::core::service::{self, ServiceStatus};

fn status_label(status: &ServiceStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        ServiceStatus::Running { .. } => text.green(),
        ServiceStatus::WaitingForLogon => text.yellow(),
        ServiceStatus::Stopped | ServiceStatus::NotInstalled => text.red(),
    }
}

/// `Log size` / `Last modified` lines for an existing log file.
fn log_file_lines(size: u64, modified: Option<SystemTime>) -> Vec<String> {
    let mut lines = vec![format!("Log size: {} bytes", size)];
    if let Some(modified) = modified {
        let local: DateTime<Local> = modified.into();
        lines.push(format!(
            "Last modified: {}",
            local.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    lines
}

pub async fn run(opts: &OutputOptions) -> Result<()> {
    control::set_override(opts.use_color);
    let backend = service::backend()?;

    println!("{}", "Claude Monitor Status".bold());
    println!("=====================");

    let status = backend.status().await;
    if status == ServiceStatus::NotInstalled {
        println!("Status: {}", status_label(&status));
        println!();
        println!("Run 'claude-monitor install --email your@email.com' to install");
        return Ok(());
    }

    println!("Service: {} ({})", status_label(&status), backend.display_name());

    match MonitorConfig::load() {
        Ok(Some(config)) => {
            println!();
            println!("{}", "Configuration:".cyan());
            println!("  Email: {}", config.email);
            println!("  Server: {}", config.server_url);
            println!("  Interval: {}", format_interval(config.interval_seconds));
            if opts.verbose {
                println!("  Projects dir: {}", config::projects_dir().display());
            }
        }
        Ok(None) => println!(
            "Config: not found at {}",
            MonitorConfig::config_path().display()
        ),
        Err(e) => println!("Config: {} ({})", "Error loading".red(), e),
    }

    let log_path = config::log_path();
    println!();
    println!("Log file: {}", log_path.display());
    if let Ok(meta) = std::fs::metadata(&log_path) {
        for line in log_file_lines(meta.len(), meta.modified().ok()) {
            println!("{}", line);
        }
    }
    Ok(())
}
