//! One resolution request from fragments to every output.
//!
//! ```text
//! Received -> Merging -> Resolved -> { EnvironmentReady, HooksPlanned, TargetsComposed } -> Done
//! ```
//!
//! Only `Merging` can fail the whole request. The three consumers run in
//! parallel over the same [`ResolvedConfig`] and fail independently.
use rayon::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::FragmentSet;
use crate::environment::DevShell;
use crate::error::ResolveError;
use crate::hooks::{HookPlan, HookRegistry, build_plan};
use crate::platform::PlatformId;
use crate::resolve::{ResolvedConfig, Resolver};
use crate::targets::{BuildTarget, ProjectDescriptor, compose_all};

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Accepted, nothing done yet.
    Received,
    /// Walking imports and merging payloads.
    Merging,
    /// Merged configuration available.
    Resolved,
    /// Developer shell derived.
    EnvironmentReady,
    /// Hook plan built or failed.
    HooksPlanned,
    /// Targets composed.
    TargetsComposed,
    /// Every output produced.
    Done,
}

/// Every output of one successful merge.
#[derive(Debug)]
pub struct Resolution {
    /// The merged configuration, shared with the resolver's memo.
    pub config: Arc<ResolvedConfig>,
    /// Developer shell.
    pub shell: DevShell,
    /// Hook plan, or why it could not be built.
    pub hooks: Result<HookPlan, ResolveError>,
    /// Each project target by name, composed independently.
    pub targets: Vec<(String, Result<BuildTarget, ResolveError>)>,
}

impl Resolution {
    /// Platform this resolution is for.
    #[must_use]
    pub fn platform(&self) -> &PlatformId {
        &self.config.platform
    }

    /// Stages this request completed.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![
            Stage::Received,
            Stage::Merging,
            Stage::Resolved,
            Stage::EnvironmentReady,
        ];
        if self.hooks.is_ok() {
            stages.push(Stage::HooksPlanned);
        }
        if self.targets.iter().all(|(_, t)| t.is_ok()) {
            stages.push(Stage::TargetsComposed);
        }
        stages.push(Stage::Done);
        stages
    }

    /// Whether any downstream stage failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.hooks.is_err() || self.targets.iter().any(|(_, t)| t.is_err())
    }

    /// A JSON report; failed outputs appear as `{"error": "..."}`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        fn or_error<T: serde::Serialize>(
            r: &Result<T, ResolveError>,
        ) -> Result<Value, serde_json::Error> {
            match r {
                Ok(v) => serde_json::to_value(v),
                Err(e) => Ok(json!({ "error": e.to_string() })),
            }
        }

        let mut targets = serde_json::Map::new();
        for (name, target) in &self.targets {
            targets.insert(name.clone(), or_error(target)?);
        }
        Ok(json!({
            "platform": self.platform().as_str(),
            "config": serde_json::to_value(self.config.as_ref())?,
            "shell": serde_json::to_value(&self.shell)?,
            "hooks": or_error(&self.hooks)?,
            "targets": Value::Object(targets),
        }))
    }
}

/// Drives resolution requests.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    resolver: &'a Resolver,
    registry: &'a HookRegistry,
    project: &'a ProjectDescriptor,
}

impl<'a> Pipeline<'a> {
    /// A pipeline sharing `resolver` and `registry` across requests.
    #[must_use]
    pub const fn new(
        resolver: &'a Resolver,
        registry: &'a HookRegistry,
        project: &'a ProjectDescriptor,
    ) -> Self {
        Self {
            resolver,
            registry,
            project,
        }
    }

    /// Run one request.
    ///
    /// # Errors
    ///
    /// Returns the merge error if `Merging` fails. Downstream failures are
    /// reported inside the [`Resolution`].
    pub fn run(&self, set: &FragmentSet, platform: &PlatformId) -> Result<Resolution, ResolveError> {
        tracing::debug!(platform = %platform, stage = ?Stage::Merging, "resolving");
        let config = self.resolver.resolve(set, platform)?;
        tracing::debug!(platform = %platform, stage = ?Stage::Resolved, "merged");

        let (shell, (hooks, targets)) = rayon::join(
            || DevShell::resolve(&config),
            || {
                rayon::join(
                    || build_plan(&config.hooks, self.registry),
                    || compose_all(&config, self.project),
                )
            },
        );

        let resolution = Resolution {
            config,
            shell,
            hooks,
            targets,
        };
        tracing::debug!(platform = %platform, stages = ?resolution.stages(), "done");
        Ok(resolution)
    }

    /// Run one request per platform, concurrently.
    pub fn run_many(
        &self,
        set: &FragmentSet,
        platforms: &[PlatformId],
    ) -> Vec<(PlatformId, Result<Resolution, ResolveError>)> {
        platforms
            .par_iter()
            .map(|platform| (platform.clone(), self.run(set, platform)))
            .collect()
    }
}
