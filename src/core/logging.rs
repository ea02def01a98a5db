//! Tracing subscriber setup.
//!
//! Short-lived commands log to stderr so their stdout stays clean for JSON.
//! The agent logs to stdout and appends to its log file.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` if set, otherwise `info` (or `debug` when verbose) for this crate.
pub fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "claude_monitor=debug,info"
    } else {
        "warn,claude_monitor=info"
    }
}

pub fn init_cli(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(io::stderr().is_terminal())
                .with_writer(io::stderr),
        )
        .try_init();
}

/// Log to stdout and append to `log_path`.
///
/// Returns the file writer's guard, which must be held until exit so buffered
/// lines are flushed. If the file cannot be opened, logs to stdout only.
pub fn init_agent(verbose: bool, log_path: &Path) -> Option<WorkerGuard> {
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_ansi(io::stdout().is_terminal())
        .with_writer(io::stdout);

    match open_log_file(log_path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = tracing_subscriber::registry()
                .with(build_filter(verbose))
                .with(stdout_layer)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init();
            Some(guard)
        }
        Err(e) => {
            println!(
                "Warning: Could not open log file {}: {}",
                log_path.display(),
                e
            );
            let _ = tracing_subscriber::registry()
                .with(build_filter(verbose))
                .with(stdout_layer)
                .try_init();
            None
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_debug_for_crate() {
        assert!(default_directive(true).contains("claude_monitor=debug"));
        assert!(default_directive(false).contains("claude_monitor=info"));
    }

    #[test]
    fn log_file_is_appended_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("monitor.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "previous run\n").unwrap();

        {
            use std::io::Write;
            let mut file = open_log_file(&path).unwrap();
            writeln!(file, "next run").unwrap();
        }
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "previous run\nnext run\n"
        );
    }

    #[test]
    fn log_file_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("monitor.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the log path cannot be opened for appending.
        let path = dir.path().join("monitor.log");
        std::fs::create_dir(&path).unwrap();
        assert!(open_log_file(&path).is_err());
    }
}
