//! Summary entries recorded by the [`Logger`](super::Logger).

/// Result of one check or build step, for summary reporting.
#[derive(Debug, Clone)]
pub struct CheckEntry {
    /// Human-readable name (hook or target).
    pub name: String,
    /// How the step ended.
    pub status: CheckStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Ran and succeeded.
    Passed,
    /// Not run, e.g. because its program is missing.
    Skipped,
    /// Dry-run mode; the command was printed, not executed.
    DryRun,
    /// Ran and failed.
    Failed,
}
