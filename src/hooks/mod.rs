//! Hook pipeline construction.
//!
//! [`build_plan`] turns the merged hook mapping into an ordered execution
//! plan. Nothing here runs a hook; see [`executor`] for that.
pub mod executor;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::Settings;
use crate::error::ResolveError;
use crate::resolve::ResolvedHook;

/// Hook category. Declaration order is execution priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Formatters; run first.
    Format,
    /// Linters.
    Lint,
    /// Test runners; run last.
    Test,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => write!(f, "format"),
            Self::Lint => write!(f, "lint"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// A registered hook kind: its category and default command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookKind {
    /// Kind name referenced by hook declarations.
    pub name: String,
    /// Ordering category.
    pub category: Category,
    /// Default program and arguments.
    pub command: Vec<String>,
}

impl HookKind {
    /// A kind with the given default command line.
    #[must_use]
    pub fn new(name: &str, category: Category, command: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            category,
            command: command.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Built-in kinds.
const BUILTINS: &[(&str, Category, &[&str])] = &[
    ("rustfmt", Category::Format, &["cargo", "fmt", "--all", "--", "--check"]),
    ("nixpkgs-fmt", Category::Format, &["nixpkgs-fmt", "--check", "."]),
    ("alejandra", Category::Format, &["alejandra", "--check", "."]),
    ("taplo", Category::Format, &["taplo", "fmt", "--check"]),
    ("prettier", Category::Format, &["prettier", "--check", "."]),
    (
        "clippy",
        Category::Lint,
        &["cargo", "clippy", "--all-targets", "--", "-D", "warnings"],
    ),
    ("cargo-check", Category::Lint, &["cargo", "check", "--all-targets"]),
    ("statix", Category::Lint, &["statix", "check"]),
    ("deadnix", Category::Lint, &["deadnix", "--fail"]),
    ("shellcheck", Category::Lint, &["shellcheck"]),
    ("typos", Category::Lint, &["typos"]),
    ("cargo-test", Category::Test, &["cargo", "test", "--locked"]),
    ("nextest", Category::Test, &["cargo", "nextest", "run"]),
];

/// Known hook kinds, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    kinds: BTreeMap<String, HookKind>,
}

impl HookRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in kind.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, category, command) in BUILTINS {
            registry.register(HookKind::new(name, *category, command));
        }
        registry
    }

    /// Add or replace a kind.
    pub fn register(&mut self, kind: HookKind) {
        self.kinds.insert(kind.name.clone(), kind);
    }

    /// Look a kind up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HookKind> {
        self.kinds.get(name)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered kind names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

/// One step of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedHook {
    /// Hook name.
    pub name: String,
    /// Kind the hook runs as.
    pub kind: String,
    /// Category of the kind.
    pub category: Category,
    /// Program followed by its arguments.
    pub command: Vec<String>,
    /// Merged settings, kept for executors.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: Settings,
}

impl PlannedHook {
    /// The command as a single display string.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Ordered, enable-filtered hooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HookPlan {
    /// Enabled hooks in execution order.
    pub entries: Vec<PlannedHook>,
    /// Declared hooks left out because they are disabled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

impl HookPlan {
    /// Whether no hook will run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hook names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

/// Derive the command line: `entry` replaces the default command, `args` and
/// `files` are appended.
fn command_for(kind: &HookKind, settings: &Settings) -> Vec<String> {
    let mut command = match settings.get("entry").and_then(serde_json::Value::as_str) {
        Some(entry) => entry.split_whitespace().map(String::from).collect(),
        None => kind.command.clone(),
    };
    for key in ["args", "files"] {
        if let Some(values) = settings.get(key).and_then(serde_json::Value::as_array) {
            command.extend(values.iter().filter_map(|v| v.as_str().map(String::from)));
        }
    }
    command
}

/// Build the execution plan.
///
/// Every declared hook, enabled or not, must reference a registered kind.
/// Enabled hooks are ordered by category (format, lint, test), keeping
/// declaration order within a category.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownHook`] for the first unregistered kind.
pub fn build_plan(hooks: &[ResolvedHook], registry: &HookRegistry) -> Result<HookPlan, ResolveError> {
    let mut plan = HookPlan::default();
    for hook in hooks {
        let Some(kind) = registry.get(&hook.kind) else {
            return Err(ResolveError::UnknownHook {
                hook: hook.name.clone(),
                kind: hook.kind.clone(),
                fragment: hook.fragment.clone(),
            });
        };
        if !hook.enabled {
            plan.disabled.push(hook.name.clone());
            continue;
        }
        plan.entries.push(PlannedHook {
            name: hook.name.clone(),
            kind: hook.kind.clone(),
            category: kind.category,
            command: command_for(kind, &hook.settings),
            settings: hook.settings.clone(),
        });
    }
    plan.entries.sort_by_key(|e| e.category);
    tracing::debug!(planned = plan.entries.len(), disabled = plan.disabled.len(), "hook plan built");
    Ok(plan)
}
