//! Handing composed targets to a compiler toolchain.
use std::collections::BTreeMap;

use crate::error::ResolveError;
use crate::targets::{BuildTarget, Profile, ProjectDescriptor, TargetKind};

/// A concrete compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to run.
    pub program: String,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// Variables added to the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    /// Program and arguments as a display string.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Environment as owned pairs for [`crate::exec`].
    #[must_use]
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Turns a build target into a compiler invocation.
pub trait ToolchainProvider {
    /// `Ok(None)` means the target has nothing to build.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnsupportedPlatform`] if the provider cannot
    /// handle the target's toolchain.
    fn invocation(
        &self,
        target: &BuildTarget,
        project: &ProjectDescriptor,
    ) -> Result<Option<Invocation>, ResolveError>;
}

/// Builds Rust targets with `cargo`, selecting the channel through rustup's
/// `+channel` syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoProvider;

impl ToolchainProvider for CargoProvider {
    fn invocation(
        &self,
        target: &BuildTarget,
        project: &ProjectDescriptor,
    ) -> Result<Option<Invocation>, ResolveError> {
        if target.toolchain.name.as_deref() != Some("rust") {
            return Err(ResolveError::UnsupportedPlatform {
                platform: target.platform.to_string(),
                target: target.name.clone(),
                reason: format!(
                    "cargo cannot build toolchain '{}'",
                    target.toolchain.name.as_deref().unwrap_or("<none>")
                ),
            });
        }

        let subcommand = match target.kind {
            TargetKind::Shell => return Ok(None),
            TargetKind::Artifact => "build",
            TargetKind::Check => "test",
        };

        let mut args = Vec::new();
        if let Some(channel) = &target.toolchain.channel {
            args.push(format!("+{channel}"));
        }
        args.push(subcommand.to_string());
        if target.profile == Profile::Release {
            args.push("--release".to_string());
        }
        args.push("--locked".to_string());
        if !project.name.is_empty() {
            args.push("--package".to_string());
            args.push(project.name.clone());
        }

        Ok(Some(Invocation {
            program: "cargo".to_string(),
            args,
            env: target.env.clone(),
        }))
    }
}
