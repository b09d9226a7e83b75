//! Developer shell specification.
//!
//! Pure transformation of a [`ResolvedConfig`]; rendering to a shell script
//! is the only output format besides JSON.
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ToolRepositoryError;
use crate::platform::PlatformId;
use crate::resolve::{ResolvedConfig, Toolchain};
use crate::tools::ToolRepository;

/// Variable naming the platform the shell was resolved for.
pub const PLATFORM_VAR: &str = "ENVRESOLVE_PLATFORM";

/// Variable rustup reads to select a toolchain.
pub const RUSTUP_TOOLCHAIN_VAR: &str = "RUSTUP_TOOLCHAIN";

/// Everything a developer shell exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevShell {
    /// Platform the shell was resolved for.
    pub platform: PlatformId,
    /// Tools the shell provides, in resolution order.
    pub tools: Vec<String>,
    /// Resolved toolchain.
    pub toolchain: Toolchain,
    /// Exported variables, sorted by name.
    pub env: BTreeMap<String, String>,
    /// Directories prepended to `PATH`, filled by [`DevShell::locate_tools`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathBuf>,
}

impl DevShell {
    /// Derive the shell for the configuration's platform.
    ///
    /// Explicit `env` values always win over derived ones.
    #[must_use]
    pub fn resolve(config: &ResolvedConfig) -> Self {
        let mut env = config.env.clone();
        env.entry(PLATFORM_VAR.to_string())
            .or_insert_with(|| config.platform.to_string());
        if config.toolchain.name.as_deref() == Some("rust")
            && let Some(channel) = &config.toolchain.channel
        {
            env.entry(RUSTUP_TOOLCHAIN_VAR.to_string())
                .or_insert_with(|| channel.clone());
        }

        Self {
            platform: config.platform.clone(),
            tools: config.tools.clone(),
            toolchain: config.toolchain.clone(),
            env,
            path: Vec::new(),
        }
    }

    /// Look every tool up and record the directories holding them.
    ///
    /// # Errors
    ///
    /// Returns the first lookup failure.
    pub fn locate_tools(&mut self, repo: &dyn ToolRepository) -> Result<(), ToolRepositoryError> {
        let mut path = Vec::new();
        for tool in &self.tools {
            let located = repo.locate(tool)?;
            if let Some(dir) = located.parent().map(PathBuf::from)
                && !path.contains(&dir)
            {
                path.push(dir);
            }
        }
        self.path = path;
        Ok(())
    }

    /// Stable JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render an export script for `shell`.
    #[must_use]
    pub fn render(&self, shell: Shell) -> String {
        let mut lines = vec![
            shell.header().to_string(),
            Shell::comment(&format!("envresolve developer shell for {}", self.platform)),
        ];
        if !self.tools.is_empty() {
            lines.push(Shell::comment(&format!("tools: {}", self.tools.join(" "))));
        }
        for (name, value) in &self.env {
            lines.push(shell.export_var(name, value));
        }
        for dir in self.path.iter().rev() {
            lines.push(shell.prepend_path("PATH", &dir.display().to_string()));
        }
        let mut script = lines.join("\n");
        script.push('\n');
        script
    }
}

/// Target shell for rendered scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Shell {
    /// POSIX sh
    Sh,
    /// Bash
    Bash,
    /// Zsh
    Zsh,
    /// Fish
    Fish,
    /// `PowerShell`
    #[value(name = "powershell", alias = "pwsh")]
    PowerShell,
}

impl Shell {
    /// Guess the user's shell from `$SHELL`, falling back to POSIX `sh`
    /// (PowerShell on Windows).
    #[must_use]
    pub fn detect() -> Self {
        let name = std::env::var("SHELL").ok().and_then(|shell| {
            std::path::Path::new(&shell)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
        });
        match name.as_deref() {
            Some(n) if n.contains("zsh") => Self::Zsh,
            Some(n) if n.contains("bash") => Self::Bash,
            Some(n) if n.contains("fish") => Self::Fish,
            Some("pwsh" | "powershell") => Self::PowerShell,
            Some(_) => Self::Sh,
            None if cfg!(windows) => Self::PowerShell,
            None => Self::Sh,
        }
    }

    /// First line of a script in this dialect.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Sh => "#!/bin/sh",
            Self::Bash => "#!/usr/bin/env bash",
            Self::Zsh => "#!/usr/bin/env zsh",
            Self::Fish => "# fish",
            Self::PowerShell => "# PowerShell",
        }
    }

    /// A comment line; every supported dialect uses `#`.
    #[must_use]
    pub fn comment(text: &str) -> String {
        format!("# {text}")
    }

    /// Quote `value` so the shell reads it back verbatim.
    #[must_use]
    pub fn quote(self, value: &str) -> String {
        match self {
            Self::Sh | Self::Bash | Self::Zsh => format!("'{}'", value.replace('\'', r"'\''")),
            Self::Fish => format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'")),
            Self::PowerShell => format!("'{}'", value.replace('\'', "''")),
        }
    }

    /// Statement exporting `name` with a quoted value.
    #[must_use]
    pub fn export_var(self, name: &str, value: &str) -> String {
        let value = self.quote(value);
        match self {
            Self::Sh | Self::Bash | Self::Zsh => format!("export {name}={value}"),
            Self::Fish => format!("set -gx {name} {value}"),
            Self::PowerShell => format!("$env:{name} = {value}"),
        }
    }

    /// Statement prepending `dir` to the path-like variable `name`.
    #[must_use]
    pub fn prepend_path(self, name: &str, dir: &str) -> String {
        let dir = self.quote(dir);
        match self {
            Self::Sh | Self::Bash | Self::Zsh => format!("export {name}={dir}:\"${name}\""),
            Self::Fish => format!("set -gx {name} {dir} ${name}"),
            Self::PowerShell => {
                format!("$env:{name} = {dir} + [IO.Path]::PathSeparator + $env:{name}")
            }
        }
    }
}
