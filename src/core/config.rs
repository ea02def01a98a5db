use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Records older than this many days are left out of every report.
pub const RETENTION_DAYS: i64 = 90;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3498";
pub const DEFAULT_INTERVAL_SECONDS: u64 = 600;

pub(crate) const CONFIG_DIR_ENV: &str = "CLAUDE_MONITOR_HOME";
const PROJECTS_DIR_ENV: &str = "CLAUDE_PROJECTS_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory holding the config file, the agent log and the installed binary.
/// `$CLAUDE_MONITOR_HOME` overrides the default `~/.claude-monitor`.
pub fn config_dir() -> PathBuf {
    env_path(CONFIG_DIR_ENV).unwrap_or_else(|| home_dir().join(".claude-monitor"))
}

pub fn log_path() -> PathBuf {
    config_dir().join("monitor.log")
}

/// Where `install` copies the running executable.
pub fn installed_binary_path() -> PathBuf {
    let name = if cfg!(windows) {
        "claude-monitor.exe"
    } else {
        "claude-monitor"
    };
    config_dir().join(name)
}

/// Root of the Claude Code session logs. `$CLAUDE_PROJECTS_DIR` overrides
/// the default `~/.claude/projects`.
pub fn projects_dir() -> PathBuf {
    env_path(PROJECTS_DIR_ENV).unwrap_or_else(|| home_dir().join(".claude").join("projects"))
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

/// Values given on the command line for `install` / `run`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub email: Option<String>,
    pub server_url: Option<String>,
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            server_url: default_server_url(),
            interval_seconds: default_interval(),
        }
    }
}

impl MonitorConfig {
    pub fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Defaults with any command-line values applied. Blank values and a zero
    /// interval are ignored.
    pub fn from_overrides(overrides: &ConfigOverrides) -> Self {
        let mut config = Self::default();
        if let Some(email) = overrides.email.as_deref().map(str::trim) {
            config.email = email.to_string();
        }
        if let Some(url) = overrides.server_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                config.server_url = url.to_string();
            }
        }
        if let Some(interval) = overrides.interval_seconds {
            if interval > 0 {
                config.interval_seconds = interval;
            }
        }
        config
    }

    /// Load config from the default path. `Ok(None)` when no file exists yet.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: MonitorConfig = toml::from_str(&content)?;
        config.fill_defaults();
        Ok(Some(config))
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            create_private_dir(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn fill_defaults(&mut self) {
        if self.server_url.trim().is_empty() {
            self.server_url = default_server_url();
        }
        if self.interval_seconds == 0 {
            self.interval_seconds = default_interval();
        }
    }

    /// Upload endpoint on the configured collector.
    pub fn upload_url(&self) -> String {
        format!("{}/api/claude-usage/upload", self.server_url.trim_end_matches('/'))
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.email.trim().is_empty() {
            issues.push("Email is required".to_string());
        } else if !self.email.contains('@') {
            issues.push(format!("Invalid email: '{}'", self.email));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            issues.push(format!(
                "Invalid server_url: '{}' (must start with http:// or https://)",
                self.server_url
            ));
        }
        if self.interval_seconds == 0 {
            issues.push("interval_seconds must be greater than 0".to_string());
        }
        issues
    }
}

/// Create `dir` (and parents), restricting it to the current user on Unix.
pub fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
