//! `shell`: print a developer-shell script or its JSON form.
use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{GlobalOpts, ShellOpts};
use crate::environment::Shell;
use crate::logging::Logger;
use crate::platform::PlatformId;
use crate::tools::{PathRepository, ToolRepository};

/// Print the developer shell for the selected platform.
///
/// Tool lookup only applies to the host platform; for any other platform
/// the script carries the environment but leaves `PATH` alone.
///
/// # Errors
///
/// Returns an error if resolution fails or a required tool is missing.
pub fn run(global: &GlobalOpts, opts: &ShellOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, opts.platform.as_ref(), log)?;
    let script = render(&setup, opts, &PathRepository::new())?;
    super::emit(&script)
}

/// Build the script or JSON for `run`.
///
/// # Errors
///
/// Returns an error if resolution or tool lookup fails.
pub fn render(
    setup: &CommandSetup,
    opts: &ShellOpts,
    repo: &dyn ToolRepository,
) -> Result<String> {
    let mut shell = setup.resolve()?.shell;
    if setup.platform == PlatformId::detect() {
        shell
            .locate_tools(repo)
            .context("locating developer-shell tools")?;
    } else {
        tracing::debug!(platform = %setup.platform, "not the host platform; skipping tool lookup");
    }

    if opts.json {
        let mut json = shell.to_json()?;
        json.push('\n');
        return Ok(json);
    }
    Ok(shell.render(opts.shell.unwrap_or_else(Shell::detect)))
}
