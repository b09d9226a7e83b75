//! Subcommand orchestration over the library.
pub mod build;
pub mod check;
pub mod shell;
pub mod show;

use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::config::{PROJECT_FILE, ProjectConfig, validation};
use crate::environment::PLATFORM_VAR;
use crate::hooks::HookRegistry;
use crate::logging::Logger;
use crate::pipeline::{Pipeline, Resolution};
use crate::platform::PlatformId;
use crate::resolve::{DiskCache, Resolver};

/// Environment variable naming the project root when `--root` is absent.
pub const ROOT_VAR: &str = "ENVRESOLVE_ROOT";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates root discovery, configuration loading, validation and
/// resolver construction so that each command does not have to repeat the
/// boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Platform every output is resolved for.
    pub platform: PlatformId,
    /// The loaded project.
    pub config: ProjectConfig,
    /// Registered hook kinds.
    pub registry: HookRegistry,
    /// Memoizing resolver, with the disk cache unless `--no-cache`.
    pub resolver: Resolver,
}

impl CommandSetup {
    /// Locate the project, load all fragments and report validation warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be determined or any
    /// configuration file fails to load.
    pub fn init(global: &GlobalOpts, platform: Option<&PlatformId>, log: &Logger) -> Result<Self> {
        let platform = select_platform(platform)?;
        let root = resolve_root(global)?;
        log.debug(&format!("project root: {}", root.display()));

        log.stage("Loading configuration");
        let config = ProjectConfig::load(&root)
            .with_context(|| format!("loading project at {}", root.display()))?;
        log.info(&format!(
            "loaded {} fragment(s) for {platform}",
            config.fragments.len()
        ));

        let registry = HookRegistry::with_builtins();
        let warnings = validation::validate_all(&config, &platform, &registry);
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        let mut resolver = Resolver::new();
        if global.no_cache {
            log.debug("resolution cache disabled");
        } else if let Some(disk) = DiskCache::user_default() {
            log.debug(&format!("resolution cache: {}", disk.dir().display()));
            resolver = resolver.with_disk_cache(disk);
        }

        Ok(Self {
            platform,
            config,
            registry,
            resolver,
        })
    }

    /// A pipeline over this project.
    #[must_use]
    pub const fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.resolver, &self.registry, &self.config.project)
    }

    /// Resolve the selected platform.
    ///
    /// # Errors
    ///
    /// Returns an error if merging fails.
    pub fn resolve(&self) -> Result<Resolution> {
        self.pipeline()
            .run(&self.config.fragments, &self.platform)
            .with_context(|| format!("resolving for {}", self.platform))
    }
}

/// Pick the platform: explicit flag, then `$ENVRESOLVE_PLATFORM`, then the host.
///
/// # Errors
///
/// Returns an error if `$ENVRESOLVE_PLATFORM` is set to an invalid tag.
pub fn select_platform(explicit: Option<&PlatformId>) -> Result<PlatformId> {
    if let Some(platform) = explicit {
        return Ok(platform.clone());
    }
    match std::env::var(PLATFORM_VAR) {
        Ok(tag) if !tag.is_empty() => {
            PlatformId::new(&tag).with_context(|| format!("invalid {PLATFORM_VAR}"))
        }
        _ => Ok(PlatformId::detect()),
    }
}

/// Resolve the project root.
///
/// Uses `--root`, then `$ENVRESOLVE_ROOT`, then the nearest ancestor of the
/// current directory containing `envresolve.toml`.
///
/// # Errors
///
/// Returns an error if no project root can be found.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(ref root) = global.root {
        return canonical(root);
    }

    if let Ok(root) = std::env::var(ROOT_VAR)
        && !root.is_empty()
    {
        return canonical(Path::new(&root));
    }

    let cwd = std::env::current_dir().context("reading current directory")?;
    if let Some(root) = find_project_root(&cwd) {
        return Ok(root.to_path_buf());
    }
    anyhow::bail!(
        "cannot determine project root: no {PROJECT_FILE} in {} or any parent (use --root)",
        cwd.display()
    )
}

/// Nearest ancestor of `start` (inclusive) holding a project file.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<&Path> {
    start.ancestors().find(|dir| dir.join(PROJECT_FILE).is_file())
}

fn canonical(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).with_context(|| format!("project root {}", path.display()))
}

/// Write `text` to stdout unchanged.
///
/// Scripts and JSON go to stdout; everything else is logged to stderr.
///
/// # Errors
///
/// Returns an error if stdout cannot be flushed.
#[allow(clippy::print_stdout)]
pub fn emit(text: &str) -> Result<()> {
    print!("{text}");
    std::io::stdout().flush().context("flushing stdout")
}

/// Print the summary and bail if any recorded check failed.
///
/// # Errors
///
/// Returns an error if one or more checks recorded a failure.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} check(s) failed");
    }
    Ok(())
}
