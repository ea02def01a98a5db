use std::io::IsTerminal;

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub use_color: bool,
    pub verbose: bool,
}

pub fn detect_color(color_flag: bool) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Compact token count: `1.2M`, `3.4K`, or the plain number below 1000.
pub fn format_tokens(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        format!("{}", count)
    }
}

pub fn format_interval(seconds: u64) -> String {
    format!("{} seconds ({} minutes)", seconds, seconds / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_flag_off_disables_color() {
        assert!(!detect_color(false));
    }

    #[test]
    fn tokens_are_abbreviated() {
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_500), "1.5K");
        assert_eq!(format_tokens(2_345_678), "2.3M");
    }

    #[test]
    fn interval_shows_minutes() {
        assert_eq!(format_interval(600), "600 seconds (10 minutes)");
        assert_eq!(format_interval(90), "90 seconds (1 minutes)");
    }
}
