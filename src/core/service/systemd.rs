use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::process::{self, COMMAND_TIMEOUT};
use crate::core::service::ServiceStatus;

pub const UNIT_NAME: &str = "claude-monitor.service";

pub fn unit_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("systemd")
        .join("user")
        .join(UNIT_NAME)
}

pub fn render_unit(binary: &Path) -> String {
    format!(
        "[Unit]
Description=Claude Code usage monitor
After=network-online.target

[Service]
Type=simple
ExecStart=\"{}\" run
Restart=always
RestartSec=10

[Install]
WantedBy=default.target
",
        binary.display()
    )
}

/// Parse `systemctl show -p MainPID --value`; `0` means no main process.
pub fn parse_main_pid(output: &str) -> Option<u32> {
    output.trim().parse().ok().filter(|pid| *pid != 0)
}

async fn systemctl(args: &[&str]) -> Result<String> {
    let mut full = vec!["--user"];
    full.extend_from_slice(args);
    process::run_command("systemctl", &full, COMMAND_TIMEOUT).await
}

pub fn is_installed() -> bool {
    unit_path().exists()
}

pub async fn install(binary: &Path) -> Result<()> {
    if process::which("systemctl").is_none() {
        anyhow::bail!("systemctl not found; a systemd user session is required");
    }

    if is_installed() {
        println!("Stopping existing service...");
        let _ = systemctl(&["stop", UNIT_NAME]).await;
    }

    let unit = unit_path();
    if let Some(parent) = unit.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&unit, render_unit(binary))
        .with_context(|| format!("Failed to write {}", unit.display()))?;

    systemctl(&["daemon-reload"])
        .await
        .context("Failed to reload systemd user units")?;
    println!("Starting service...");
    systemctl(&["enable", "--now", UNIT_NAME])
        .await
        .context("Failed to enable service")?;
    Ok(())
}

pub async fn uninstall() -> Result<()> {
    let unit = unit_path();
    if !unit.exists() {
        anyhow::bail!("Service is not installed");
    }

    if let Err(e) = systemctl(&["disable", "--now", UNIT_NAME]).await {
        warn!("systemctl disable failed: {:#}", e);
    }
    std::fs::remove_file(&unit)
        .with_context(|| format!("Failed to remove {}", unit.display()))?;
    if let Err(e) = systemctl(&["daemon-reload"]).await {
        warn!("systemctl daemon-reload failed: {:#}", e);
    }
    Ok(())
}

pub async fn status() -> ServiceStatus {
    if systemctl(&["is-active", "--quiet", UNIT_NAME]).await.is_err() {
        return ServiceStatus::Stopped;
    }
    let pid = systemctl(&["show", "-p", "MainPID", "--value", UNIT_NAME])
        .await
        .ok()
        .and_then(|out| parse_main_pid(&out));
    ServiceStatus::Running { pid }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_runs_binary_and_restarts() {
        let unit = render_unit(Path::new("/home/dev/.claude-monitor/claude-monitor"));
        assert!(unit.contains("ExecStart=\"/home/dev/.claude-monitor/claude-monitor\" run\n"));
        assert!(unit.contains("Restart=always"));
        assert!(unit.contains("WantedBy=default.target"));
    }

    #[test]
    fn unit_path_is_user_scoped() {
        assert!(unit_path().ends_with("systemd/user/claude-monitor.service"));
    }

    #[test]
    fn main_pid_parsing() {
        assert_eq!(parse_main_pid("1234\n"), Some(1234));
        assert_eq!(parse_main_pid("0"), None);
        assert_eq!(parse_main_pid(""), None);
    }
}
