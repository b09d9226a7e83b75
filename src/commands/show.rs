//! `show`: resolve platforms and print every output.
use anyhow::{Context as _, Result};
use std::fmt::{self, Write as _};

use crate::cli::{Format, GlobalOpts, ShowOpts};
use crate::logging::{CheckStatus, Logger};
use crate::pipeline::Resolution;
use crate::platform::PlatformId;

/// Resolve every requested platform concurrently and print the outputs.
///
/// # Errors
///
/// Returns an error if loading fails or any platform fails to resolve.
pub fn run(global: &GlobalOpts, opts: &ShowOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, opts.platform.first(), log)?;
    let platforms: Vec<PlatformId> = if opts.all_systems {
        if setup.config.project.systems.is_empty() {
            anyhow::bail!("--all-systems requires [project] systems in the project file");
        }
        setup.config.project.systems.clone()
    } else if opts.platform.is_empty() {
        vec![setup.platform.clone()]
    } else {
        opts.platform.clone()
    };

    log.stage(&format!("Resolving {} platform(s)", platforms.len()));
    let results = setup.pipeline().run_many(&setup.config.fragments, &platforms);

    let mut report = serde_json::Map::new();
    let mut text = String::new();
    for (platform, result) in &results {
        match result {
            Ok(resolution) => {
                let status = if resolution.has_errors() {
                    CheckStatus::Failed
                } else {
                    CheckStatus::Passed
                };
                log.record(platform.as_str(), status, None);
                match opts.format {
                    Format::Json => {
                        report.insert(platform.to_string(), resolution.to_json()?);
                    }
                    Format::Text => describe(&mut text, resolution)?,
                }
            }
            Err(e) => {
                log.error(&format!("{platform}: {e}"));
                log.record(platform.as_str(), CheckStatus::Failed, Some(&e.to_string()));
                if opts.format == Format::Json {
                    report.insert(platform.to_string(), serde_json::json!({ "error": e.to_string() }));
                } else {
                    writeln!(text, "{platform}: error: {e}")?;
                }
            }
        }
    }

    if opts.format == Format::Json {
        text = serde_json::to_string_pretty(&report).context("serializing report")?;
        text.push('\n');
    }
    super::emit(&text)?;
    super::finish(log)
}

/// Human-readable summary of one resolution.
///
/// # Errors
///
/// Only fails if writing to the buffer fails.
pub fn describe(out: &mut String, resolution: &Resolution) -> fmt::Result {
    let config = &resolution.config;
    writeln!(out, "{}", resolution.platform())?;
    writeln!(out, "  fragments: {}", config.fragments.join(", "))?;
    writeln!(out, "  tools: {}", config.tools.join(", "))?;
    let toolchain = &config.toolchain;
    writeln!(
        out,
        "  toolchain: {} {} [{}] (from {})",
        toolchain.name.as_deref().unwrap_or("-"),
        toolchain.channel.as_deref().unwrap_or("-"),
        toolchain.components.join(", "),
        config.origin("toolchain.channel"),
    )?;
    for (name, value) in &resolution.shell.env {
        writeln!(out, "  env {name}={value}")?;
    }
    match &resolution.hooks {
        Ok(plan) => {
            for hook in &plan.entries {
                writeln!(out, "  hook {} [{}]: {}", hook.name, hook.category, hook.command_line())?;
            }
            if !plan.disabled.is_empty() {
                writeln!(out, "  disabled: {}", plan.disabled.join(", "))?;
            }
        }
        Err(e) => writeln!(out, "  hooks: error: {e}")?,
    }
    for (name, target) in &resolution.targets {
        match target {
            Ok(t) => writeln!(
                out,
                "  target {name}: {} {} deps [{}]",
                t.kind,
                t.profile,
                t.dependencies.join(", ")
            )?,
            Err(e) => writeln!(out, "  target {name}: error: {e}")?,
        }
    }
    Ok(())
}
