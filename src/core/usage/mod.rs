//! Collection of token usage from Claude Code JSONL session logs.
//!
//! The walker lists `*.jsonl` files, each line goes through the record parser,
//! accepted events update a per-run [`table::MessageTable`], and the table is
//! finally folded into a [`crate::core::models::report::UsageReport`].

pub mod aggregate;
pub mod lines;
pub mod record;
pub mod scanner;
pub mod table;
pub mod walker;

pub use scanner::{collect, collect_since_retention, retention_cutoff, CollectStats, Collection};
pub use walker::CollectError;
