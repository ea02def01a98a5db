use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::core::models::usage::TokenUsage;

const ASSISTANT_KIND: &str = "assistant";

/// Prefix for identities synthesized from the timestamp of records without a
/// `message.id`.
pub const FALLBACK_ID_PREFIX: &str = "no_id_";

// ── Claude JSONL structs ──────────────────────────────────────────────

#[derive(Deserialize)]
struct JsonlUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct JsonlMessage {
    id: Option<String>,
    usage: Option<JsonlUsage>,
}

#[derive(Deserialize)]
struct JsonlLine {
    #[serde(rename = "type")]
    kind: Option<String>,
    timestamp: Option<String>,
    message: Option<JsonlMessage>,
}

impl From<JsonlUsage> for TokenUsage {
    fn from(raw: JsonlUsage) -> Self {
        TokenUsage {
            input_tokens: raw.input_tokens.unwrap_or(0),
            output_tokens: raw.output_tokens.unwrap_or(0),
            cache_write_tokens: raw.cache_creation_input_tokens.unwrap_or(0),
            cache_read_tokens: raw.cache_read_input_tokens.unwrap_or(0),
        }
    }
}

// ── Timestamps ────────────────────────────────────────────────────────

/// A timestamp layout accepted in the `timestamp` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// RFC 3339 with offset, fractional seconds optional.
    Rfc3339,
    /// `2024-01-01T00:00:00.000Z`
    UtcMillis,
}

/// Formats tried in order; the first one that parses wins.
pub const ACCEPTED_FORMATS: &[TimestampFormat] =
    &[TimestampFormat::Rfc3339, TimestampFormat::UtcMillis];

impl TimestampFormat {
    pub fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::UtcMillis => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3fZ")
                .ok()
                .map(|naive| naive.and_utc()),
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    ACCEPTED_FORMATS.iter().find_map(|format| format.parse(raw))
}

// ── Parsed event ──────────────────────────────────────────────────────

/// Why a line did not produce a usage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// Not valid JSON, or fields of the wrong type.
    Malformed,
    /// Longer than the per-line bound of the reader.
    LineTooLong,
    NotAssistant,
    MissingTimestamp,
    InvalidTimestamp,
    BeforeCutoff,
    MissingUsage,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::LineTooLong => "line_too_long",
            Self::NotAssistant => "not_assistant",
            Self::MissingTimestamp => "missing_timestamp",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::BeforeCutoff => "before_cutoff",
            Self::MissingUsage => "missing_usage",
        }
    }
}

/// A billable assistant response extracted from one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    /// Effective message identity (explicit id or synthesized fallback).
    pub identity: String,
    pub timestamp: DateTime<Utc>,
    pub usage: TokenUsage,
}

impl UsageEvent {
    /// UTC calendar day this event is counted under.
    pub fn date_bucket(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Identity used to merge records of one response. Records without an id are
/// keyed by their raw timestamp so they never collide with each other unless
/// the timestamps are identical.
pub fn effective_identity(message_id: Option<&str>, raw_timestamp: &str) -> String {
    match message_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("{}{}", FALLBACK_ID_PREFIX, raw_timestamp),
    }
}

/// Decode one JSONL line. Records older than `cutoff` are rejected.
pub fn parse_line(line: &[u8], cutoff: DateTime<Utc>) -> Result<UsageEvent, SkipReason> {
    let parsed: JsonlLine = serde_json::from_slice(line).map_err(|_| SkipReason::Malformed)?;

    if parsed.kind.as_deref() != Some(ASSISTANT_KIND) {
        return Err(SkipReason::NotAssistant);
    }

    let raw_timestamp = match parsed.timestamp {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Err(SkipReason::MissingTimestamp),
    };

    let timestamp = parse_timestamp(&raw_timestamp).ok_or(SkipReason::InvalidTimestamp)?;
    if timestamp < cutoff {
        return Err(SkipReason::BeforeCutoff);
    }

    let message = parsed.message.ok_or(SkipReason::MissingUsage)?;
    let usage = message.usage.ok_or(SkipReason::MissingUsage)?;

    Ok(UsageEvent {
        identity: effective_identity(message.id.as_deref(), &raw_timestamp),
        timestamp,
        usage: usage.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn epoch_cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_full_assistant_record() {
        let line = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00Z","message":{"id":"msg_1","model":"claude-sonnet-4-5","usage":{"input_tokens":1000,"output_tokens":200,"cache_creation_input_tokens":50,"cache_read_input_tokens":500}}}"#;
        let event = parse_line(line, epoch_cutoff()).unwrap();
        assert_eq!(event.identity, "msg_1");
        assert_eq!(event.usage, TokenUsage::new(1000, 200, 50, 500));
        assert_eq!(
            event.date_bucket(),
            NaiveDate::from_ymd_opt(2025, 2, 24).unwrap()
        );
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let line = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00Z","message":{"id":"m","usage":{"input_tokens":7,"output_tokens":null}}}"#;
        let event = parse_line(line, epoch_cutoff()).unwrap();
        assert_eq!(event.usage, TokenUsage::new(7, 0, 0, 0));
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert_eq!(
            parse_line(b"{not json", epoch_cutoff()),
            Err(SkipReason::Malformed)
        );
        // A partially written trailing line
        assert_eq!(
            parse_line(br#"{"type":"assistant","timestamp":"2025-02"#, epoch_cutoff()),
            Err(SkipReason::Malformed)
        );
    }

    #[test]
    fn negative_counter_is_malformed() {
        let line = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00Z","message":{"id":"m","usage":{"input_tokens":-1}}}"#;
        assert_eq!(parse_line(line, epoch_cutoff()), Err(SkipReason::Malformed));
    }

    #[test]
    fn non_assistant_records_are_skipped() {
        let line = br#"{"type":"user","timestamp":"2025-02-24T10:00:00Z","message":{"content":"hello"}}"#;
        assert_eq!(parse_line(line, epoch_cutoff()), Err(SkipReason::NotAssistant));

        let untyped = br#"{"timestamp":"2025-02-24T10:00:00Z"}"#;
        assert_eq!(parse_line(untyped, epoch_cutoff()), Err(SkipReason::NotAssistant));
    }

    #[test]
    fn empty_or_absent_timestamp_is_skipped() {
        let empty = br#"{"type":"assistant","timestamp":"","message":{"id":"m","usage":{}}}"#;
        assert_eq!(parse_line(empty, epoch_cutoff()), Err(SkipReason::MissingTimestamp));

        let absent = br#"{"type":"assistant","message":{"id":"m","usage":{}}}"#;
        assert_eq!(parse_line(absent, epoch_cutoff()), Err(SkipReason::MissingTimestamp));
    }

    #[test]
    fn unparseable_timestamp_is_skipped() {
        let line = br#"{"type":"assistant","timestamp":"yesterday","message":{"id":"m","usage":{}}}"#;
        assert_eq!(parse_line(line, epoch_cutoff()), Err(SkipReason::InvalidTimestamp));
    }

    #[test]
    fn missing_or_null_usage_is_skipped() {
        let absent = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00Z","message":{"id":"m"}}"#;
        assert_eq!(parse_line(absent, epoch_cutoff()), Err(SkipReason::MissingUsage));

        let null = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00Z","message":{"id":"m","usage":null}}"#;
        assert_eq!(parse_line(null, epoch_cutoff()), Err(SkipReason::MissingUsage));

        let no_message = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00Z"}"#;
        assert_eq!(parse_line(no_message, epoch_cutoff()), Err(SkipReason::MissingUsage));
    }

    #[test]
    fn records_before_cutoff_are_skipped() {
        let now = Utc::now();
        let cutoff = now - Duration::days(90);

        let old = (now - Duration::days(91)).to_rfc3339();
        let line = format!(
            r#"{{"type":"assistant","timestamp":"{}","message":{{"id":"m","usage":{{"input_tokens":1}}}}}}"#,
            old
        );
        assert_eq!(parse_line(line.as_bytes(), cutoff), Err(SkipReason::BeforeCutoff));

        let recent = (now - Duration::days(89)).to_rfc3339();
        let line = format!(
            r#"{{"type":"assistant","timestamp":"{}","message":{{"id":"m","usage":{{"input_tokens":1}}}}}}"#,
            recent
        );
        assert!(parse_line(line.as_bytes(), cutoff).is_ok());
    }

    #[test]
    fn record_exactly_at_cutoff_is_kept() {
        let cutoff = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let line = br#"{"type":"assistant","timestamp":"2025-01-01T12:00:00Z","message":{"id":"m","usage":{}}}"#;
        assert!(parse_line(line, cutoff).is_ok());
    }

    #[test]
    fn fallback_identity_uses_raw_timestamp() {
        let line = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00.123Z","message":{"usage":{"input_tokens":1}}}"#;
        let event = parse_line(line, epoch_cutoff()).unwrap();
        assert_eq!(event.identity, "no_id_2025-02-24T10:00:00.123Z");

        let empty_id = br#"{"type":"assistant","timestamp":"2025-02-24T10:00:00Z","message":{"id":"","usage":{}}}"#;
        let event = parse_line(empty_id, epoch_cutoff()).unwrap();
        assert_eq!(event.identity, "no_id_2025-02-24T10:00:00Z");
    }

    #[test]
    fn date_bucket_is_utc_day() {
        // 23:30 at -05:00 is 04:30 UTC the next day
        let line = br#"{"type":"assistant","timestamp":"2025-03-01T23:30:00-05:00","message":{"id":"m","usage":{}}}"#;
        let event = parse_line(line, epoch_cutoff()).unwrap();
        assert_eq!(
            event.date_bucket(),
            NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
        );
    }

    #[test]
    fn timestamp_formats_are_tried_in_order() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T01:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00.000Z"), Some(expected));
        assert_eq!(
            TimestampFormat::UtcMillis.parse("2024-01-01T00:00:00.000Z"),
            Some(expected)
        );
        assert_eq!(TimestampFormat::UtcMillis.parse("2024-01-01T00:00:00+01:00"), None);
        assert_eq!(parse_timestamp("2024-01-01"), None);
    }
}
