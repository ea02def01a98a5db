use anyhow::{Context, Result};
use colored::{control, Colorize};
use std::path::PathBuf;

use crate::cli::output::{format_tokens, OutputOptions};
use crate::core::config;
use crate::core::usage::{self, CollectStats, Collection};

pub fn default_output_path() -> PathBuf {
    std::env::temp_dir().join("claude-usage.json")
}

fn summary_lines(collection: &Collection) -> Vec<String> {
    let report = &collection.report;
    let total = report.total_tokens();
    vec![
        format!("Total days: {}", report.days()),
        format!("Total tokens: {} ({})", total, format_tokens(total)),
        format!("Total requests: {}", report.total_requests()),
    ]
}

fn stats_lines(stats: &CollectStats, verbose: bool) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Files scanned: {} (failed: {})",
            stats.files_scanned, stats.files_failed
        ),
        format!("Lines read: {}", stats.lines_read),
        format!("Events accepted: {}", stats.events_accepted),
        format!("Messages resolved: {}", stats.messages_resolved),
    ];
    if stats.entries_skipped > 0 {
        lines.push(format!("Directory entries skipped: {}", stats.entries_skipped));
    }
    if verbose {
        for (reason, count) in &stats.skipped {
            lines.push(format!("  skipped {}: {}", reason.as_str(), count));
        }
    }
    lines
}

/// Collect without uploading and write the report that would be sent.
pub async fn run(output: Option<PathBuf>, json: bool, opts: &OutputOptions) -> Result<()> {
    control::set_override(opts.use_color);
    let projects_dir = config::projects_dir();

    if !json {
        println!("Test mode: Collecting usage data without uploading...");
        println!("Projects dir: {}", projects_dir.display());
    }

    let collection =
        tokio::task::spawn_blocking(move || usage::collect_since_retention(&projects_dir))
            .await?
            .context("Failed to collect usage data")?;
    let rendered = serde_json::to_string_pretty(&collection.report)?;

    if json {
        println!("{}", rendered);
        return Ok(());
    }

    let path = output.unwrap_or_else(default_output_path);
    std::fs::write(&path, rendered)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!();
    println!("Output saved to: {}", path.display().to_string().bold());
    for line in summary_lines(&collection) {
        println!("{}", line);
    }
    println!();
    println!("{}", "Collection:".cyan());
    for line in stats_lines(&collection.stats, opts.verbose) {
        println!("  {}", line);
    }
    Ok(())
}
