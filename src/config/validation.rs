//! Non-fatal configuration checks, reported as warnings before resolution.
use super::{Fragment, Payload, Predicate, ProjectConfig};
use crate::hooks::HookRegistry;
use crate::platform::{PlatformId, is_known_arch, is_known_family};
use crate::resolve::graph;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The file the fragment came from (e.g. `fragments/rust.toml`).
    pub source: String,
    /// The fragment field or entry that triggered the warning.
    pub item: String,
    /// What is wrong.
    pub message: String,
}

impl ValidationWarning {
    /// A warning about `item` in `source`.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, config: &ProjectConfig, platform: &PlatformId) -> Vec<ValidationWarning>;

    /// Short name used in debug output.
    fn name(&self) -> &'static str;
}

fn source_of<'a>(config: &'a ProjectConfig, fragment: &Fragment) -> &'a str {
    config.fragments.source_of(&fragment.id).unwrap_or("<unknown>")
}

/// Every payload of a fragment, conditional ones included.
fn payloads(fragment: &Fragment) -> impl Iterator<Item = &Payload> {
    std::iter::once(&fragment.payload).chain(fragment.conditionals.iter().map(|c| &c.payload))
}

/// Empty or repeated tool identifiers.
#[derive(Debug)]
pub struct ToolValidator;

impl ConfigValidator for ToolValidator {
    fn validate(&self, config: &ProjectConfig, _platform: &PlatformId) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for fragment in config.fragments.iter() {
            let source = source_of(config, fragment);
            for payload in payloads(fragment) {
                let mut seen = Vec::new();
                for tool in &payload.tools {
                    if tool.trim().is_empty() {
                        warnings.push(ValidationWarning::new(source, &fragment.id, "tool identifier is empty"));
                    } else if seen.contains(&tool) {
                        warnings.push(ValidationWarning::new(
                            source,
                            format!("{}.tools", fragment.id),
                            format!("tool '{tool}' listed twice"),
                        ));
                    }
                    seen.push(tool);
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "tools"
    }
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Environment variable names a shell cannot export.
#[derive(Debug)]
pub struct EnvValidator;

impl ConfigValidator for EnvValidator {
    fn validate(&self, config: &ProjectConfig, _platform: &PlatformId) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for fragment in config.fragments.iter() {
            for payload in payloads(fragment) {
                for key in payload.env.keys().filter(|k| !is_valid_env_name(k)) {
                    warnings.push(ValidationWarning::new(
                        source_of(config, fragment),
                        format!("env.{key}"),
                        "not a valid environment variable name",
                    ));
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

/// Hook kinds and settings the pipeline builder would reject or ignore.
#[derive(Debug)]
pub struct HookValidator<'a> {
    registry: &'a HookRegistry,
}

impl<'a> HookValidator<'a> {
    /// Check hooks against the kinds in `registry`.
    #[must_use]
    pub const fn new(registry: &'a HookRegistry) -> Self {
        Self { registry }
    }
}

impl ConfigValidator for HookValidator<'_> {
    fn validate(&self, config: &ProjectConfig, _platform: &PlatformId) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for fragment in config.fragments.iter() {
            let source = source_of(config, fragment);
            for hook in payloads(fragment).flat_map(|p| &p.hooks) {
                let item = format!("hooks.{}", hook.name);
                if hook.kind.is_some() && !self.registry.contains(hook.kind()) {
                    warnings.push(ValidationWarning::new(
                        source,
                        &item,
                        format!("unknown hook kind '{}'", hook.kind()),
                    ));
                }
                if hook.settings.get("entry").is_some_and(|v| !v.is_string()) {
                    warnings.push(ValidationWarning::new(source, &item, "setting 'entry' must be a string"));
                }
                for key in ["args", "files"] {
                    if hook.settings.get(key).is_some_and(|v| !v.is_array()) {
                        warnings.push(ValidationWarning::new(
                            source,
                            &item,
                            format!("setting '{key}' must be an array of strings"),
                        ));
                    }
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "hooks"
    }
}

fn unknown_predicate_terms(predicate: &Predicate, out: &mut Vec<String>) {
    match predicate {
        Predicate::Family(f) if !is_known_family(f) => out.push(format!("family '{f}'")),
        Predicate::Arch(a) if !is_known_arch(a) => out.push(format!("arch '{a}'")),
        Predicate::Any(inner) | Predicate::All(inner) => {
            for p in inner {
                unknown_predicate_terms(p, out);
            }
        }
        Predicate::Not(inner) => unknown_predicate_terms(inner, out),
        _ => {}
    }
}

/// Predicates naming a family or architecture that can never match.
#[derive(Debug)]
pub struct PredicateValidator;

impl ConfigValidator for PredicateValidator {
    fn validate(&self, config: &ProjectConfig, _platform: &PlatformId) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for fragment in config.fragments.iter() {
            for (index, entry) in fragment.conditionals.iter().enumerate() {
                let Some(when) = &entry.when else { continue };
                let mut unknown = Vec::new();
                unknown_predicate_terms(when, &mut unknown);
                for term in unknown {
                    warnings.push(ValidationWarning::new(
                        source_of(config, fragment),
                        format!("{}.conditional[{index}]", fragment.id),
                        format!("{term} never matches"),
                    ));
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "predicates"
    }
}

/// Fragments the root never imports, and platforms outside `systems`.
#[derive(Debug)]
pub struct ProjectValidator;

impl ConfigValidator for ProjectValidator {
    fn validate(&self, config: &ProjectConfig, platform: &PlatformId) -> Vec<ValidationWarning> {
        let mut warnings: Vec<_> = graph::unreachable(&config.fragments)
            .into_iter()
            .map(|id| {
                let source = config.fragments.source_of(&id).unwrap_or("<unknown>").to_string();
                ValidationWarning::new(source, id, "fragment is not imported by the root and is ignored")
            })
            .collect();
        if !config.project.supports(platform) {
            warnings.push(ValidationWarning::new(
                super::PROJECT_FILE,
                "project.systems",
                format!("platform '{platform}' is not listed"),
            ));
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "project"
    }
}

/// Run every validator.
#[must_use]
pub fn validate_all(
    config: &ProjectConfig,
    platform: &PlatformId,
    registry: &HookRegistry,
) -> Vec<ValidationWarning> {
    let hooks = HookValidator::new(registry);
    let validators: [&dyn ConfigValidator; 5] = [
        &ToolValidator,
        &EnvValidator,
        &hooks,
        &PredicateValidator,
        &ProjectValidator,
    ];
    validators
        .iter()
        .flat_map(|v| {
            let warnings = v.validate(config, platform);
            tracing::trace!(validator = v.name(), count = warnings.len(), "validated");
            warnings
        })
        .collect()
}
