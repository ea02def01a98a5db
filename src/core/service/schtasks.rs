use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use crate::core::process::{self, COMMAND_TIMEOUT};
use crate::core::service::ServiceStatus;

pub const TASK_NAME: &str = "ClaudeMonitor";
const PROCESS_IMAGE: &str = "claude-monitor.exe";

/// `schtasks /Create` arguments for a logon-triggered task running `<binary> run`.
pub fn create_args(binary: &Path) -> Vec<String> {
    vec![
        "/Create".to_string(),
        "/TN".to_string(),
        TASK_NAME.to_string(),
        "/TR".to_string(),
        format!("\"{}\" run", binary.display()),
        "/SC".to_string(),
        "ONLOGON".to_string(),
        "/RL".to_string(),
        "LIMITED".to_string(),
        "/F".to_string(),
    ]
}

/// Task state from `schtasks /Query /FO LIST` output, or `None` if the
/// `Status:` line is missing.
pub fn parse_query_status(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Status:")
            .map(|rest| rest.trim().to_string())
    })
}

/// Map the reported task state to a service status. `Ready` means the task
/// exists but its trigger has not fired in this session, unless the process
/// was started some other way.
pub fn status_from_task_state(state: Option<&str>, process_alive: bool) -> ServiceStatus {
    match state {
        Some("Running") => ServiceStatus::Running { pid: None },
        Some("Ready") if process_alive => ServiceStatus::Running { pid: None },
        Some("Ready") => ServiceStatus::WaitingForLogon,
        _ => ServiceStatus::Stopped,
    }
}

pub async fn is_installed() -> bool {
    process::command_succeeds("schtasks", &["/Query", "/TN", TASK_NAME]).await
}

pub async fn install(binary: &Path) -> Result<()> {
    if is_installed().await {
        println!("Removing existing task...");
        let _ = process::run_command("schtasks", &["/End", "/TN", TASK_NAME], COMMAND_TIMEOUT).await;
        let _ = process::run_command(
            "schtasks",
            &["/Delete", "/TN", TASK_NAME, "/F"],
            COMMAND_TIMEOUT,
        )
        .await;
    }

    let args = create_args(binary);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    process::run_command("schtasks", &args, COMMAND_TIMEOUT)
        .await
        .context("Failed to create scheduled task")?;

    println!("Starting task...");
    if let Err(e) = process::run_command("schtasks", &["/Run", "/TN", TASK_NAME], COMMAND_TIMEOUT).await
    {
        warn!("Task created but could not be started now: {:#}", e);
    }
    Ok(())
}

pub async fn uninstall() -> Result<()> {
    if !is_installed().await {
        anyhow::bail!("Service is not installed");
    }

    let _ = process::run_command("schtasks", &["/End", "/TN", TASK_NAME], COMMAND_TIMEOUT).await;
    process::run_command(
        "schtasks",
        &["/Delete", "/TN", TASK_NAME, "/F"],
        COMMAND_TIMEOUT,
    )
    .await
    .context("Failed to delete scheduled task")?;
    Ok(())
}

async fn process_alive() -> bool {
    let filter = format!("IMAGENAME eq {}", PROCESS_IMAGE);
    match process::run_command("tasklist", &["/FI", &filter, "/NH"], COMMAND_TIMEOUT).await {
        Ok(output) => output.to_lowercase().contains(PROCESS_IMAGE),
        Err(_) => false,
    }
}

pub async fn status() -> ServiceStatus {
    let output = match process::run_command(
        "schtasks",
        &["/Query", "/TN", TASK_NAME, "/FO", "LIST"],
        COMMAND_TIMEOUT,
    )
    .await
    {
        Ok(output) => output,
        Err(_) => return ServiceStatus::Stopped,
    };

    let state = parse_query_status(&output);
    let alive = match state.as_deref() {
        Some("Ready") => process_alive().await,
        _ => false,
    };
    status_from_task_state(state.as_deref(), alive)
}
