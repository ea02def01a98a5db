//! Registration of the agent as a per-user login service.
//!
//! Each platform has its own backend; all of them compile everywhere so the
//! generated service definitions can be tested on any host.

pub mod launchd;
pub mod schtasks;
pub mod systemd;

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    NotInstalled,
    Running { pid: Option<u32> },
    /// Registered but no process is alive.
    Stopped,
    /// Registered and waiting for the next login to start.
    WaitingForLogon,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "Not installed"),
            Self::Running { pid: Some(pid) } => write!(f, "Running (PID: {})", pid),
            Self::Running { pid: None } => write!(f, "Running"),
            Self::Stopped => write!(f, "Installed but not running"),
            Self::WaitingForLogon => write!(f, "Installed (ready to run at next logon)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Launchd,
    ScheduledTask,
    Systemd,
}

impl Backend {
    /// Backend for the host OS, if service registration is supported here.
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::Launchd)
        } else if cfg!(windows) {
            Some(Self::ScheduledTask)
        } else if cfg!(target_os = "linux") {
            Some(Self::Systemd)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Launchd => "LaunchAgent",
            Self::ScheduledTask => "Scheduled Task",
            Self::Systemd => "systemd user service",
        }
    }

    /// Register `binary run` to start at login, replacing any previous registration.
    pub async fn install(&self, binary: &Path, log_path: &Path) -> Result<()> {
        match self {
            Self::Launchd => launchd::install(binary, log_path).await,
            Self::ScheduledTask => schtasks::install(binary).await,
            Self::Systemd => systemd::install(binary).await,
        }
    }

    pub async fn uninstall(&self) -> Result<()> {
        match self {
            Self::Launchd => launchd::uninstall().await,
            Self::ScheduledTask => schtasks::uninstall().await,
            Self::Systemd => systemd::uninstall().await,
        }
    }

    pub async fn is_installed(&self) -> bool {
        match self {
            Self::Launchd => launchd::is_installed(),
            Self::ScheduledTask => schtasks::is_installed().await,
            Self::Systemd => systemd::is_installed(),
        }
    }

    pub async fn status(&self) -> ServiceStatus {
        if !self.is_installed().await {
            return ServiceStatus::NotInstalled;
        }
        match self {
            Self::Launchd => launchd::status().await,
            Self::ScheduledTask => schtasks::status().await,
            Self::Systemd => systemd::status().await,
        }
    }
}

/// Host backend, or an error on platforms without one.
pub fn backend() -> Result<Backend> {
    Backend::current().context("Service registration is not supported on this platform")
}

/// Copy the running executable to `dest` so the service survives the original
/// being moved or deleted.
pub fn install_binary(dest: &Path) -> Result<PathBuf> {
    let source = std::env::current_exe()
        .and_then(|p| p.canonicalize())
        .context("Failed to get executable path")?;
    copy_binary(&source, dest)?;
    Ok(dest.to_path_buf())
}

fn copy_binary(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        config::create_private_dir(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    // Reinstalling from the installed copy: copying onto itself would truncate it.
    if dest.exists() && dest.canonicalize().ok().as_deref() == Some(source) {
        return Ok(());
    }

    std::fs::copy(source, dest)
        .with_context(|| format!("Failed to copy binary to {}", dest.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to set permissions on {}", dest.display()))?;
    }
    Ok(())
}

/// Escape a value for inclusion in XML text content.
pub(crate) fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
