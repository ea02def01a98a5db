use chrono::NaiveDate;
use std::collections::HashMap;

use crate::core::models::report::{DailyTotal, UsageReport};
use crate::core::usage::table::MessageTable;

/// Fold resolved messages into per-day totals, ascending by date.
pub fn daily_totals(table: &MessageTable) -> UsageReport {
    if table.is_empty() {
        return UsageReport::default();
    }

    let mut by_date: HashMap<NaiveDate, DailyTotal> = HashMap::new();
    for message in table.messages() {
        by_date
            .entry(message.date_bucket)
            .or_insert_with(|| DailyTotal::empty(message.date_bucket.format("%Y-%m-%d").to_string()))
            .add(&message.usage);
    }

    let mut daily: Vec<DailyTotal> = by_date
        .into_values()
        .map(|mut day| {
            day.finalize();
            day
        })
        .collect();
    // YYYY-MM-DD sorts lexicographically in calendar order
    daily.sort_by(|a, b| a.date.cmp(&b.date));

    UsageReport { daily }
}
