//! Structured logger with summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{CheckEntry, CheckStatus};
use super::utils::log_file_path;

/// Tracing target for stage headers.
pub(super) const STAGE_TARGET: &str = "envresolve::stage";

/// Tracing target for dry-run messages.
pub(super) const DRY_RUN_TARGET: &str = "envresolve::dry_run";

/// Structured logger with summary collection.
///
/// All messages are also written to `$XDG_CACHE_HOME/envresolve/<command>.log`
/// with timestamps and ANSI codes stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    checks: Mutex<Vec<CheckEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the summary. The file itself
    /// is written by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            checks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<CheckEntry> {
        self.checks.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log what a dry run would have done.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a check result for the summary.
    pub fn record(&self, name: &str, status: CheckStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.checks.lock() {
            guard.push(CheckEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed checks.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.checks.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == CheckStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded checks.
    pub fn print_summary(&self) {
        let checks = self.entries();
        if checks.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut passed = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for check in &checks {
            let (icon, color) = match check.status {
                CheckStatus::Passed => {
                    passed += 1;
                    ("✓", "\x1b[32m")
                }
                CheckStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                CheckStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                CheckStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = check
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", check.name));
        }

        let total = passed + skipped + dry_run + failed;
        self.info(&format!(
            "{total} checks: \x1b[32m{passed} passed\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn logger_new() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.entries().is_empty(), "expected empty check list");
    }

    #[test]
    fn record_with_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record("typos", CheckStatus::Skipped, Some("typos not found"));
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "typos");
        assert_eq!(entries[0].message, Some("typos not found".to_string()));
    }

    #[test]
    fn failure_count_returns_correct_count() {
        let (log, _tmp, _guard) = isolated_logger();
        assert_eq!(log.failure_count(), 0);
        log.record("a", CheckStatus::Passed, None);
        log.record("b", CheckStatus::Failed, Some("exit 1"));
        log.record("c", CheckStatus::Failed, Some("exit 2"));
        log.record("d", CheckStatus::Skipped, None);
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn log_file_is_created() {
        let (log, _tmp, _guard) = isolated_logger();
        let path = log.log_path().expect("log path should exist");
        assert!(path.exists(), "log file should be created by the file layer");
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains(&marker));
    }

    #[test]
    fn warn_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("warn-marker-{}", std::process::id());
        log.warn(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[warn]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn stage_written_to_file_with_arrow() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("stage-marker-{}", std::process::id());
        log.stage(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("==>"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn dry_run_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("dryrun-marker-{}", std::process::id());
        log.dry_run(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[dry run]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn summary_lists_recorded_checks_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record("rustfmt", CheckStatus::Passed, None);
        log.record("clippy", CheckStatus::Failed, Some("exit 101"));
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("✓ rustfmt"));
        assert!(contents.contains("✗ clippy (exit 101)"));
        assert!(contents.contains("2 checks: 1 passed, 0 skipped, 0 dry-run, 1 failed"));
    }
}
