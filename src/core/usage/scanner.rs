use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::core::config::RETENTION_DAYS;
use crate::core::models::report::UsageReport;
use crate::core::usage::aggregate;
use crate::core::usage::lines::Line;
use crate::core::usage::record::{self, SkipReason};
use crate::core::usage::table::MessageTable;
use crate::core::usage::walker::{self, CollectError, LogFiles};

/// Counters describing one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub files_scanned: usize,
    /// Files that could not be opened or failed mid-read.
    pub files_failed: usize,
    /// Directory entries skipped because of traversal errors.
    pub entries_skipped: usize,
    pub lines_read: usize,
    pub events_accepted: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub messages_resolved: usize,
}

impl CollectStats {
    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    #[cfg(test)]
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub report: UsageReport,
    pub stats: CollectStats,
}

/// Start of the retention window relative to `now`.
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RETENTION_DAYS)
}

/// Build the daily report for every log under `root`, ignoring records older
/// than `cutoff`.
pub fn collect(root: &Path, cutoff: DateTime<Utc>) -> Result<UsageReport, CollectError> {
    collect_with_stats(root, cutoff).map(|c| c.report)
}

/// [`collect_with_stats`] with the cutoff set to the retention window ending now.
pub fn collect_since_retention(root: &Path) -> Result<Collection, CollectError> {
    collect_with_stats(root, retention_cutoff(Utc::now()))
}

pub fn collect_with_stats(root: &Path, cutoff: DateTime<Utc>) -> Result<Collection, CollectError> {
    let mut files = LogFiles::discover(root)?;
    let mut table = MessageTable::new();
    let mut stats = CollectStats::default();

    for path in files.by_ref() {
        match scan_file(&path, cutoff, &mut table, &mut stats) {
            Ok(()) => stats.files_scanned += 1,
            Err(err) => {
                stats.files_failed += 1;
                debug!(file = %path.display(), error = %err, "Skipping unreadable log file");
            }
        }
    }

    stats.entries_skipped = files.skipped_entries();
    stats.messages_resolved = table.len();

    let report = aggregate::daily_totals(&table);
    debug!(
        files = stats.files_scanned,
        failed = stats.files_failed,
        lines = stats.lines_read,
        accepted = stats.events_accepted,
        messages = stats.messages_resolved,
        days = report.days(),
        "Collection finished"
    );

    Ok(Collection { report, stats })
}

/// Feed every line of one file into the table. A read error stops this file
/// only; records accepted before it stay in the table.
fn scan_file(
    path: &Path,
    cutoff: DateTime<Utc>,
    table: &mut MessageTable,
    stats: &mut CollectStats,
) -> std::io::Result<()> {
    for line in walker::open_lines(path)? {
        let bytes = match line? {
            Line::Complete(bytes) => bytes,
            Line::TooLong => {
                stats.lines_read += 1;
                stats.skip(SkipReason::LineTooLong);
                continue;
            }
        };
        stats.lines_read += 1;

        match record::parse_line(&bytes, cutoff) {
            Ok(event) => {
                stats.events_accepted += 1;
                table.record(event);
            }
            Err(reason) => stats.skip(reason),
        }
    }
    Ok(())
}
