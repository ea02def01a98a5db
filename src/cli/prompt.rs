use anyhow::{Context, Result};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use crate::core::config::{
    ConfigOverrides, MonitorConfig, DEFAULT_INTERVAL_SECONDS, DEFAULT_SERVER_URL,
};

/// Load the saved config, or create one from `overrides` (prompting on a
/// terminal when no email was given) and save it. A new config is only
/// written once it passes validation.
pub fn get_or_create(overrides: &ConfigOverrides) -> Result<MonitorConfig> {
    let path = MonitorConfig::config_path();
    let existing = MonitorConfig::load_from(&path).context("Failed to load config")?;
    resolve(existing, overrides, &path, || {
        if !io::stdin().is_terminal() {
            anyhow::bail!(
                "No configuration found at {}. Pass --email to create one.",
                path.display()
            );
        }
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        prompt_config(&mut stdin.lock(), &mut stdout)
    })
}

fn resolve<F>(
    existing: Option<MonitorConfig>,
    overrides: &ConfigOverrides,
    path: &Path,
    prompt: F,
) -> Result<MonitorConfig>
where
    F: FnOnce() -> Result<MonitorConfig>,
{
    if let Some(config) = existing {
        ensure_valid(&config)
            .with_context(|| format!("Fix or remove the config file at {}", path.display()))?;
        return Ok(config);
    }

    let mut config = MonitorConfig::from_overrides(overrides);
    if config.email.is_empty() {
        config = prompt()?;
    }
    ensure_valid(&config)?;

    let saved = config.save().context("Failed to save config")?;
    println!("Configuration saved to {}", saved.display());
    println!();
    Ok(config)
}

fn ensure_valid(config: &MonitorConfig) -> Result<()> {
    let issues = config.validate();
    if !issues.is_empty() {
        anyhow::bail!("Invalid configuration: {}", issues.join("; "));
    }
    Ok(())
}

/// Read one answer. Returns `default` for an empty answer and `None` at EOF.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: Option<&str>,
) -> io::Result<Option<String>> {
    match default {
        Some(d) => write!(output, "{} [{}]: ", label, d)?,
        None => write!(output, "{}: ", label)?,
    }
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let answer = line.trim();
    if answer.is_empty() {
        return Ok(Some(default.unwrap_or_default().to_string()));
    }
    Ok(Some(answer.to_string()))
}

pub fn prompt_config<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<MonitorConfig> {
    writeln!(output, "Claude Monitor Configuration")?;
    writeln!(output, "============================")?;
    writeln!(output)?;

    let email = loop {
        match ask(input, output, "Email (required)", None)? {
            Some(email) if email.contains('@') => break email,
            Some(email) if email.is_empty() => writeln!(output, "Error: Email is required")?,
            Some(email) => writeln!(output, "Error: Invalid email: '{}'", email)?,
            None => anyhow::bail!("Input closed before an email was entered"),
        }
    };

    let server_url = loop {
        match ask(input, output, "Server URL", Some(DEFAULT_SERVER_URL))? {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => break url,
            Some(url) => writeln!(
                output,
                "Error: Server URL must start with http:// or https:// (got '{}')",
                url
            )?,
            None => break DEFAULT_SERVER_URL.to_string(),
        }
    };

    let default_interval = DEFAULT_INTERVAL_SECONDS.to_string();
    let interval_seconds = ask(
        input,
        output,
        "Upload interval in seconds",
        Some(default_interval.as_str()),
    )?
    .and_then(|s| s.parse::<u64>().ok())
    .filter(|n| *n > 0)
    .unwrap_or(DEFAULT_INTERVAL_SECONDS);

    writeln!(output)?;
    Ok(MonitorConfig {
        email,
        server_url,
        interval_seconds,
    })
}
