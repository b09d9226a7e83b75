//! `check`: run the enabled quality-gate hooks.
use anyhow::Result;

use crate::cli::{CheckOpts, GlobalOpts};
use crate::hooks::executor::{self, SystemHookExecutor};
use crate::logging::Logger;

/// Run the enabled hooks for the selected platform.
///
/// # Errors
///
/// Returns an error if resolution or hook planning fails, or if any hook
/// fails.
pub fn run(global: &GlobalOpts, opts: &CheckOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, opts.platform.as_ref(), log)?;
    let resolution = setup.resolve()?;
    let plan = resolution.hooks?;

    log.stage(&format!("Planning hooks for {}", setup.platform));
    for name in &plan.disabled {
        log.debug(&format!("{name} is disabled"));
    }
    if plan.is_empty() {
        log.info("no hooks enabled");
        return Ok(());
    }
    log.info(&format!("{} hook(s): {}", plan.entries.len(), plan.names().join(", ")));

    log.stage("Running hooks");
    if opts.dry_run {
        executor::dry_run_plan(&plan, log);
    } else {
        let runner = SystemHookExecutor::new(&setup.config.root_dir);
        executor::run_plan(&plan, &runner, &resolution.shell.env, log);
    }
    super::finish(log)
}
