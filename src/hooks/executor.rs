//! Running a [`HookPlan`].
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{HookPlan, PlannedHook};
use crate::exec;
use crate::logging::{CheckStatus, Logger};

/// Outcome of one hook run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// The hook ran and succeeded.
    Passed,
    /// The hook ran and reported failure.
    Failed(String),
    /// The hook could not run.
    Skipped(String),
}

/// Runs planned hooks.
#[cfg_attr(test, mockall::automock)]
pub trait HookExecutor: Send + Sync {
    /// Run `hook` with `env` added to the inherited environment.
    fn execute(&self, hook: &PlannedHook, env: &BTreeMap<String, String>) -> HookOutcome;
}

/// Spawns each hook's command in the project root.
#[derive(Debug, Clone)]
pub struct SystemHookExecutor {
    root: PathBuf,
}

impl SystemHookExecutor {
    /// Run hooks with `root` as the working directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl HookExecutor for SystemHookExecutor {
    fn execute(&self, hook: &PlannedHook, env: &BTreeMap<String, String>) -> HookOutcome {
        let Some((program, args)) = hook.command.split_first() else {
            return HookOutcome::Skipped("empty command".to_string());
        };
        if !exec::which(program) {
            return HookOutcome::Skipped(format!("{program} not found"));
        }
        let env: Vec<(String, String)> = env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        match exec::run_unchecked_in_with_env(&self.root, program, args, &env) {
            Ok(result) if result.success => HookOutcome::Passed,
            Ok(result) => {
                let detail = result
                    .stderr
                    .lines()
                    .rev()
                    .find(|l| !l.trim().is_empty())
                    .map_or_else(String::new, |l| format!(": {}", l.trim()));
                HookOutcome::Failed(format!("exit {}{detail}", result.code.unwrap_or(-1)))
            }
            Err(e) => HookOutcome::Failed(format!("{e:#}")),
        }
    }
}

/// Run every hook in plan order, recording each result on `log`.
///
/// All hooks run even after a failure so the summary is complete.
pub fn run_plan(
    plan: &HookPlan,
    executor: &dyn HookExecutor,
    env: &BTreeMap<String, String>,
    log: &Logger,
) -> Vec<(String, HookOutcome)> {
    let mut outcomes = Vec::with_capacity(plan.entries.len());
    for hook in &plan.entries {
        log.debug(&format!("running {} ({})", hook.name, hook.command_line()));
        let outcome = executor.execute(hook, env);
        match &outcome {
            HookOutcome::Passed => log.record(&hook.name, CheckStatus::Passed, None),
            HookOutcome::Failed(msg) => {
                log.error(&format!("{} failed: {msg}", hook.name));
                log.record(&hook.name, CheckStatus::Failed, Some(msg));
            }
            HookOutcome::Skipped(msg) => {
                log.warn(&format!("{} skipped: {msg}", hook.name));
                log.record(&hook.name, CheckStatus::Skipped, Some(msg));
            }
        }
        outcomes.push((hook.name.clone(), outcome));
    }
    outcomes
}

/// Print each planned command without running it.
pub fn dry_run_plan(plan: &HookPlan, log: &Logger) {
    for hook in &plan.entries {
        log.dry_run(&format!("{} [{}]: {}", hook.name, hook.category, hook.command_line()));
        log.record(&hook.name, CheckStatus::DryRun, None);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::hooks::Category;
    use crate::logging::isolated_logger;

    fn planned(name: &str, command: &[&str]) -> PlannedHook {
        PlannedHook {
            name: name.to_string(),
            kind: name.to_string(),
            category: Category::Lint,
            command: command.iter().map(ToString::to_string).collect(),
            settings: Settings::new(),
        }
    }

    #[test]
    fn run_plan_runs_everything_and_records() {
        let (log, _tmp, _guard) = isolated_logger();
        let plan = HookPlan {
            entries: vec![planned("a", &["a"]), planned("b", &["b"]), planned("c", &["c"])],
            disabled: Vec::new(),
        };
        let mut executor = MockHookExecutor::new();
        executor.expect_execute().times(3).returning(|hook, _| match hook.name.as_str() {
            "a" => HookOutcome::Failed("exit 1".to_string()),
            "b" => HookOutcome::Skipped("b not found".to_string()),
            _ => HookOutcome::Passed,
        });

        let outcomes = run_plan(&plan, &executor, &BTreeMap::new(), &log);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2].1, HookOutcome::Passed);
        assert_eq!(log.failure_count(), 1);
        let statuses: Vec<_> = log.entries().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            [CheckStatus::Failed, CheckStatus::Skipped, CheckStatus::Passed]
        );
    }

    #[test]
    fn dry_run_records_without_executing() {
        let (log, _tmp, _guard) = isolated_logger();
        let plan = HookPlan {
            entries: vec![planned("clippy", &["cargo", "clippy"])],
            disabled: Vec::new(),
        };
        dry_run_plan(&plan, &log);
        assert_eq!(log.entries()[0].status, CheckStatus::DryRun);
    }

    #[test]
    fn system_executor_skips_missing_program() {
        let executor = SystemHookExecutor::new(std::env::temp_dir());
        let outcome = executor.execute(
            &planned("ghost", &["this-program-does-not-exist-12345"]),
            &BTreeMap::new(),
        );
        assert!(matches!(outcome, HookOutcome::Skipped(ref m) if m.contains("not found")));
    }

    #[test]
    fn system_executor_skips_empty_command() {
        let executor = SystemHookExecutor::new(std::env::temp_dir());
        assert_eq!(
            executor.execute(&planned("empty", &[]), &BTreeMap::new()),
            HookOutcome::Skipped("empty command".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_passes_environment() {
        let executor = SystemHookExecutor::new(std::env::temp_dir());
        let mut env = BTreeMap::new();
        env.insert("HOOK_EXPECT".to_string(), "yes".to_string());
        let ok = planned("env", &["sh", "-c", "test \"$HOOK_EXPECT\" = yes"]);
        assert_eq!(executor.execute(&ok, &env), HookOutcome::Passed);
        let fail = planned("fail", &["sh", "-c", "echo broken >&2; exit 3"]);
        assert_eq!(
            executor.execute(&fail, &env),
            HookOutcome::Failed("exit 3: broken".to_string())
        );
    }
}
