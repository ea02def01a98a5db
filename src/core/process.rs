use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default bound for external tools (`launchctl`, `schtasks`, `systemctl`, `hostname`).
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Run a command with arguments and a timeout, returning trimmed stdout.
/// A non-zero exit is an error carrying stderr (or stdout when stderr is empty).
pub async fn run_command(cmd: &str, args: &[&str], timeout: Duration) -> Result<String> {
    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(cmd)
            .args(args)
            .kill_on_drop(true)
            .output(),
    )
    .await
    .context(format!("Command `{}` timed out", cmd))?
    .context(format!("Failed to execute `{}`", cmd))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        anyhow::bail!("`{}` exited with {}: {}", cmd, output.status, detail);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a command only for its exit status; spawn failures and timeouts count as failure.
pub async fn command_succeeds(cmd: &str, args: &[&str]) -> bool {
    run_command(cmd, args, COMMAND_TIMEOUT).await.is_ok()
}

/// Check if a binary exists in PATH. Returns the full path if found.
pub fn which(binary: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(binary))
            .find(|p| p.is_file())
    })
}
