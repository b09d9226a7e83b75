//! `build`: compose a target and hand it to the toolchain.
use anyhow::{Context as _, Result};

use crate::cli::{BuildOpts, GlobalOpts};
use crate::exec;
use crate::logging::{CheckStatus, Logger};
use crate::targets::compose;
use crate::toolchain::{CargoProvider, Invocation, ToolchainProvider};

/// Run the build command.
///
/// # Errors
///
/// Returns an error if resolution or composition fails, or if the compiler
/// exits non-zero.
pub fn run(global: &GlobalOpts, opts: &BuildOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, opts.platform.as_ref(), log)?;
    let Some(invocation) = plan(&setup, &opts.target, &CargoProvider)? else {
        log.info(&format!("target '{}' has nothing to build", opts.target));
        return Ok(());
    };

    log.stage(&format!("Building {} for {}", opts.target, setup.platform));
    if opts.dry_run {
        for (k, v) in &invocation.env {
            log.dry_run(&format!("{k}={v}"));
        }
        log.dry_run(&invocation.command_line());
        log.record(&opts.target, CheckStatus::DryRun, None);
        return super::finish(log);
    }

    log.debug(&invocation.command_line());
    exec::run_in_with_env(
        &setup.config.root_dir,
        &invocation.program,
        &invocation.args,
        &invocation.env_pairs(),
    )?;
    log.record(&opts.target, CheckStatus::Passed, None);
    super::finish(log)
}

/// Resolve the selected platform and turn `target` into an invocation.
///
/// # Errors
///
/// Returns an error if merging, composition or the provider fails.
pub fn plan(
    setup: &super::CommandSetup,
    target: &str,
    provider: &dyn ToolchainProvider,
) -> Result<Option<Invocation>> {
    let config = setup
        .resolver
        .resolve(&setup.config.fragments, &setup.platform)
        .with_context(|| format!("resolving for {}", setup.platform))?;
    let composed = compose(&config, &setup.config.project, target)?;
    Ok(provider.invocation(&composed, &setup.config.project)?)
}
