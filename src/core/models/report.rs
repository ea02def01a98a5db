use serde::{Deserialize, Serialize};

use crate::core::models::usage::TokenUsage;

/// Aggregated usage for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    /// `YYYY-MM-DD`
    pub date: String,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cache_write_tokens: u64,
    pub total_cache_read_tokens: u64,
    /// Always the sum of the four counters above.
    pub total_tokens: u64,
    pub request_count: u64,
}

impl DailyTotal {
    pub fn empty(date: String) -> Self {
        Self {
            date,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cache_write_tokens: 0,
            total_cache_read_tokens: 0,
            total_tokens: 0,
            request_count: 0,
        }
    }

    /// Fold one resolved message into this day.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.total_input_tokens = self.total_input_tokens.saturating_add(usage.input_tokens);
        self.total_output_tokens = self.total_output_tokens.saturating_add(usage.output_tokens);
        self.total_cache_write_tokens = self
            .total_cache_write_tokens
            .saturating_add(usage.cache_write_tokens);
        self.total_cache_read_tokens = self
            .total_cache_read_tokens
            .saturating_add(usage.cache_read_tokens);
        self.request_count += 1;
    }

    /// Derive `total_tokens` from the component counters. Counters saturate at
    /// `u64::MAX` instead of wrapping.
    pub fn finalize(&mut self) {
        self.total_tokens = TokenUsage::new(
            self.total_input_tokens,
            self.total_output_tokens,
            self.total_cache_write_tokens,
            self.total_cache_read_tokens,
        )
        .total();
    }
}

/// Daily totals in ascending date order. This is the payload uploaded to the
/// collector as `usage.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub daily: Vec<DailyTotal>,
}

impl UsageReport {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }

    pub fn days(&self) -> usize {
        self.daily.len()
    }

    pub fn total_tokens(&self) -> u64 {
        self.daily
            .iter()
            .fold(0u64, |acc, d| acc.saturating_add(d.total_tokens))
    }

    pub fn total_requests(&self) -> u64 {
        self.daily
            .iter()
            .fold(0u64, |acc, d| acc.saturating_add(d.request_count))
    }
}
