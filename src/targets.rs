//! Build target composition.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::environment::DevShell;
use crate::error::ResolveError;
use crate::platform::PlatformId;
use crate::resolve::{ResolvedConfig, Toolchain};

/// Variable telling sqlx to use its offline query cache.
pub const SQLX_OFFLINE_VAR: &str = "SQLX_OFFLINE";

/// Variable disabling incremental compilation for reproducible builds.
pub const CARGO_INCREMENTAL_VAR: &str = "CARGO_INCREMENTAL";

/// Names of the targets the composer knows, in display order.
pub const KNOWN_TARGETS: &[&str] = &["devShell", "release", "check", "debug"];

/// Project-level facts that are not part of any fragment.
///
/// Read from the `[project]` table of `envresolve.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectDescriptor {
    /// Crate or package name.
    pub name: String,
    /// Build against the offline query cache.
    pub offline: bool,
    /// Platforms the project supports; empty means any.
    pub systems: Vec<PlatformId>,
    /// Toolchain components every target needs.
    pub components: Vec<String>,
    /// Targets composed by default.
    pub targets: Vec<String>,
}

impl Default for ProjectDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            offline: false,
            systems: Vec::new(),
            components: Vec::new(),
            targets: ["devShell", "release", "check"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl ProjectDescriptor {
    /// Whether `platform` is one of the project's systems.
    #[must_use]
    pub fn supports(&self, platform: &PlatformId) -> bool {
        self.systems.is_empty() || self.systems.contains(platform)
    }
}

/// What a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// An interactive developer environment.
    Shell,
    /// A compiled output.
    Artifact,
    /// A test/lint run that produces no artifact.
    Check,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell => write!(f, "shell"),
            Self::Artifact => write!(f, "artifact"),
            Self::Check => write!(f, "check"),
        }
    }
}

/// Compilation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Unoptimised, with debug info.
    Debug,
    /// Optimised.
    Release,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// A named, platform-specific build output. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTarget {
    /// Target name, e.g. `release`.
    pub name: String,
    /// What the target produces.
    pub kind: TargetKind,
    /// Compilation profile.
    pub profile: Profile,
    /// Platform the target is built for.
    pub platform: PlatformId,
    /// Resolved toolchain plus the project's components.
    pub toolchain: Toolchain,
    /// Build environment.
    pub env: BTreeMap<String, String>,
    /// Tools followed by the native libraries this target links.
    pub dependencies: Vec<String>,
}

fn shape(name: &str) -> Option<(TargetKind, Profile)> {
    match name {
        "devShell" => Some((TargetKind::Shell, Profile::Debug)),
        "release" => Some((TargetKind::Artifact, Profile::Release)),
        "check" => Some((TargetKind::Check, Profile::Debug)),
        "debug" => Some((TargetKind::Artifact, Profile::Debug)),
        _ => None,
    }
}

/// Compose one named target.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownTarget`] for an unknown name and
/// [`ResolveError::UnsupportedPlatform`] when the platform is outside the
/// project's systems or no complete toolchain was resolved for it.
pub fn compose(
    config: &ResolvedConfig,
    project: &ProjectDescriptor,
    name: &str,
) -> Result<BuildTarget, ResolveError> {
    let Some((kind, profile)) = shape(name) else {
        return Err(ResolveError::UnknownTarget {
            name: name.to_string(),
            known: KNOWN_TARGETS.join(", "),
        });
    };

    let platform = &config.platform;
    let unsupported = |reason: String| ResolveError::UnsupportedPlatform {
        platform: platform.to_string(),
        target: name.to_string(),
        reason,
    };
    if !project.supports(platform) {
        let systems: Vec<&str> = project.systems.iter().map(PlatformId::as_str).collect();
        return Err(unsupported(format!(
            "project supports only {}",
            systems.join(", ")
        )));
    }
    if !config.toolchain.is_complete() {
        return Err(unsupported(
            "no toolchain name and channel resolved for this platform".to_string(),
        ));
    }

    let mut toolchain = config.toolchain.clone();
    for component in &project.components {
        if !toolchain.components.contains(component) {
            toolchain.components.push(component.clone());
        }
    }

    let mut env = match kind {
        TargetKind::Shell => DevShell::resolve(config).env,
        TargetKind::Artifact | TargetKind::Check => config.env.clone(),
    };
    if project.offline {
        env.entry(SQLX_OFFLINE_VAR.to_string())
            .or_insert_with(|| "true".to_string());
    }
    if kind != TargetKind::Shell {
        env.entry(CARGO_INCREMENTAL_VAR.to_string())
            .or_insert_with(|| "0".to_string());
    }

    let mut dependencies = config.tools.clone();
    for dep in config.native.iter().filter(|d| d.applies_to(name)) {
        if !dependencies.contains(&dep.name) {
            dependencies.push(dep.name.clone());
        }
    }

    Ok(BuildTarget {
        name: name.to_string(),
        kind,
        profile,
        platform: platform.clone(),
        toolchain,
        env,
        dependencies,
    })
}

/// Compose every target the project lists. Each target succeeds or fails on
/// its own.
#[must_use]
pub fn compose_all(
    config: &ResolvedConfig,
    project: &ProjectDescriptor,
) -> Vec<(String, Result<BuildTarget, ResolveError>)> {
    project
        .targets
        .iter()
        .map(|name| (name.clone(), compose(config, project, name)))
        .collect()
}
