use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::process::{self, COMMAND_TIMEOUT};
use crate::core::service::{xml_escape, ServiceStatus};

pub const LABEL: &str = "com.claude.monitor";

pub fn plist_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join("Library")
        .join("LaunchAgents")
        .join(format!("{}.plist", LABEL))
}

/// LaunchAgent definition running `<binary> run` at login and keeping it alive.
pub fn render_plist(binary: &Path, log_path: &Path) -> String {
    let binary = xml_escape(&binary.display().to_string());
    let log = xml_escape(&log_path.display().to_string());
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{binary}</string>
        <string>run</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{log}</string>
    <key>StandardErrorPath</key>
    <string>{log}</string>
    <key>EnvironmentVariables</key>
    <dict>
        <key>PATH</key>
        <string>/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin</string>
    </dict>
</dict>
</plist>
"#,
        label = LABEL,
        binary = binary,
        log = log,
    )
}

/// Parse `launchctl list <label>` output into a status.
///
/// Newer launchd prints a dictionary (`"PID" = 123;`), older versions a
/// `PID Status Label` row where the PID is `-` when not running.
pub fn parse_list_output(output: &str) -> ServiceStatus {
    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("\"PID\" = ") {
            let pid = rest.trim_end_matches(';').trim().parse().ok();
            return ServiceStatus::Running { pid };
        }
    }

    if let Some(first) = output.lines().next() {
        let fields: Vec<&str> = first.split_whitespace().collect();
        if fields.len() >= 2 {
            if let Ok(pid) = fields[0].parse::<u32>() {
                return ServiceStatus::Running { pid: Some(pid) };
            }
        }
    }

    ServiceStatus::Stopped
}

pub fn is_installed() -> bool {
    plist_path().exists()
}

pub async fn install(binary: &Path, log_path: &Path) -> Result<()> {
    let plist = plist_path();
    let plist_str = plist.display().to_string();

    if plist.exists() {
        println!("Stopping existing service...");
        let _ = process::run_command("launchctl", &["unload", &plist_str], COMMAND_TIMEOUT).await;
    }

    if let Some(parent) = plist.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&plist, render_plist(binary, log_path))
        .with_context(|| format!("Failed to write {}", plist.display()))?;

    println!("Starting service...");
    process::run_command("launchctl", &["load", &plist_str], COMMAND_TIMEOUT)
        .await
        .context("Failed to load LaunchAgent")?;
    Ok(())
}

pub async fn uninstall() -> Result<()> {
    let plist = plist_path();
    if !plist.exists() {
        anyhow::bail!("Service is not installed");
    }

    let plist_str = plist.display().to_string();
    if let Err(e) = process::run_command("launchctl", &["unload", &plist_str], COMMAND_TIMEOUT).await
    {
        warn!("launchctl unload failed: {:#}", e);
    }

    std::fs::remove_file(&plist)
        .with_context(|| format!("Failed to remove {}", plist.display()))?;
    Ok(())
}

pub async fn status() -> ServiceStatus {
    match process::run_command("launchctl", &["list", LABEL], COMMAND_TIMEOUT).await {
        Ok(output) => parse_list_output(&output),
        Err(_) => ServiceStatus::Stopped,
    }
}
