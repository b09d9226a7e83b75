//! Command-line interface definition.
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::environment::Shell;
use crate::platform::PlatformId;

/// Top-level CLI entry point for the environment resolution engine.
#[derive(Parser, Debug)]
#[command(
    name = "envresolve",
    about = "Declarative developer-environment and build-target resolution",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// Name used for the per-command log file.
    #[must_use]
    pub const fn command_name(&self) -> &'static str {
        match self.command {
            Command::Build(_) => "build",
            Command::Check(_) => "check",
            Command::Shell(_) => "shell",
            Command::Show(_) => "show",
            Command::Completions(_) => "completions",
            Command::Version => "version",
        }
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Project directory containing envresolve.toml (defaults to the nearest ancestor)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Do not read or write the on-disk resolution cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose a build target and hand it to the toolchain
    Build(BuildOpts),
    /// Run the enabled quality-gate hooks
    Check(CheckOpts),
    /// Print a developer-shell export script
    Shell(ShellOpts),
    /// Resolve one or more platforms and print every output
    Show(ShowOpts),
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `build` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct BuildOpts {
    /// Platform to build for (defaults to the host, or $ENVRESOLVE_PLATFORM)
    #[arg(short, long)]
    pub platform: Option<PlatformId>,

    /// Build target name
    #[arg(short, long, default_value = "release")]
    pub target: String,

    /// Print the invocation without running it
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}

/// Options for the `check` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CheckOpts {
    /// Platform whose hooks to run
    #[arg(short, long)]
    pub platform: Option<PlatformId>,

    /// List planned hooks without running them
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}

/// Options for the `shell` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ShellOpts {
    /// Platform to resolve
    #[arg(short, long)]
    pub platform: Option<PlatformId>,

    /// Script dialect (defaults to $SHELL)
    #[arg(short, long, value_enum)]
    pub shell: Option<Shell>,

    /// Print the environment as JSON instead of a script
    #[arg(long, conflicts_with = "shell")]
    pub json: bool,
}

/// Output format for `show`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Human-readable summary.
    #[default]
    Text,
    /// One JSON object keyed by platform.
    Json,
}

/// Options for the `show` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ShowOpts {
    /// Platforms to resolve; repeatable (defaults to the host)
    #[arg(short, long)]
    pub platform: Vec<PlatformId>,

    /// Resolve every platform listed in `[project] systems`
    #[arg(long, conflicts_with = "platform")]
    pub all_systems: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: Format,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
