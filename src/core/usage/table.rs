use chrono::NaiveDate;
use std::collections::HashMap;

use crate::core::models::usage::TokenUsage;
use crate::core::usage::record::UsageEvent;

/// Latest known state of one logical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub date_bucket: NaiveDate,
    pub usage: TokenUsage,
}

/// Per-run map from effective message identity to its latest usage snapshot.
///
/// Streaming responses are logged as a series of records for the same
/// message id, each carrying updated counters. Only the last write counts, so
/// `update` overwrites instead of accumulating.
#[derive(Debug, Default)]
pub struct MessageTable {
    entries: HashMap<String, ResolvedMessage>,
}

impl MessageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, identity: String, date_bucket: NaiveDate, usage: TokenUsage) {
        self.entries
            .insert(identity, ResolvedMessage { date_bucket, usage });
    }

    pub fn record(&mut self, event: UsageEvent) {
        let date_bucket = event.date_bucket();
        self.update(event.identity, date_bucket, event.usage);
    }

    #[cfg(test)]
    pub fn get(&self, identity: &str) -> Option<&ResolvedMessage> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &ResolvedMessage> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn later_update_replaces_earlier_snapshot() {
        let mut table = MessageTable::new();
        table.update("m1".into(), day(1), TokenUsage::new(10, 5, 0, 0));
        table.update("m1".into(), day(1), TokenUsage::new(10, 5, 2, 1));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("m1").unwrap().usage, TokenUsage::new(10, 5, 2, 1));
    }

    #[test]
    fn overwrite_moves_date_bucket() {
        let mut table = MessageTable::new();
        table.update("m1".into(), day(1), TokenUsage::new(1, 0, 0, 0));
        table.update("m1".into(), day(2), TokenUsage::new(2, 0, 0, 0));
        assert_eq!(table.get("m1").unwrap().date_bucket, day(2));
    }

    #[test]
    fn distinct_identities_are_kept_apart() {
        let mut table = MessageTable::new();
        table.update("a".into(), day(1), TokenUsage::new(1, 0, 0, 0));
        table.update("b".into(), day(1), TokenUsage::new(2, 0, 0, 0));
        assert_eq!(table.len(), 2);
        assert_eq!(table.messages().map(|m| m.usage.input_tokens).sum::<u64>(), 3);
    }

    #[test]
    fn new_table_is_empty() {
        let table = MessageTable::new();
        assert!(table.is_empty());
        assert!(table.get("anything").is_none());
    }
}
