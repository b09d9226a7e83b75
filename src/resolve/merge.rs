//! Field-wise merge of fragment payloads into a [`ResolvedConfig`].
//!
//! Payloads are absorbed in merge order; later payloads extend or override
//! earlier ones:
//!
//! | field               | policy                                          |
//! |---------------------|-------------------------------------------------|
//! | `tools`             | union, first-appearance order                   |
//! | `toolchain.*`       | scalars last-writer-wins, `components` union    |
//! | `hooks`             | keyed; settings shallow-merged, explicit flags win |
//! | `env`               | keyed, last-writer-wins                         |
//! | `native`            | union                                           |
//!
//! The only hard failure is two *required* toolchain declarations that
//! disagree on `name` or `channel` when the later one lacks `override`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{HookDecl, NativeDep, Payload, Settings, ToolchainSpec};
use crate::error::ResolveError;
use crate::platform::PlatformId;

/// Merged toolchain descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Toolchain name, e.g. `rust`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Release channel, e.g. `stable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Components in first-appearance order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// Name and channel are mandatory.
    #[serde(default)]
    pub required: bool,
    /// The current name or channel was written with `override = true`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub overridden: bool,
}

impl Toolchain {
    /// Whether enough is known to build with this toolchain.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.name.is_some() && self.channel.is_some()
    }
}

/// A hook after merging. Immutable once resolution finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHook {
    /// Hook name.
    pub name: String,
    /// Registered kind it runs as.
    pub kind: String,
    /// Whether the plan includes it.
    pub enabled: bool,
    /// Merged settings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: Settings,
    /// Fragment that last set the hook's kind.
    pub fragment: String,
}

/// Presence of a hook in a resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// Declared and switched on.
    Enabled,
    /// Declared somewhere but switched off, or never switched on.
    Disabled,
    /// Not declared by any applicable fragment.
    Absent,
}

/// The merged configuration for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Id of the root fragment.
    pub root: String,
    /// Platform the configuration was resolved for.
    pub platform: PlatformId,
    /// Fragment ids in the order they were merged.
    pub fragments: Vec<String>,
    /// Tools in first-appearance order.
    pub tools: Vec<String>,
    /// Merged toolchain.
    pub toolchain: Toolchain,
    /// Hooks in order of first declaration.
    pub hooks: Vec<ResolvedHook>,
    /// Environment variables, sorted by name.
    pub env: BTreeMap<String, String>,
    /// Native libraries in first-appearance order.
    pub native: Vec<NativeDep>,
    /// Field path (`toolchain.channel`, `env.KEY`, `hooks.NAME.enabled`, ...)
    /// to the fragment that last wrote it.
    pub origins: BTreeMap<String, String>,
}

fn record(origins: &mut BTreeMap<String, String>, field: String, source: &str) {
    origins.insert(field, source.to_string());
}

fn union_into<T: Clone + PartialEq>(target: &mut Vec<T>, items: &[T]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

impl ResolvedConfig {
    /// An empty configuration to absorb payloads into.
    #[must_use]
    pub fn new(root: impl Into<String>, platform: PlatformId) -> Self {
        Self {
            root: root.into(),
            platform,
            fragments: Vec::new(),
            tools: Vec::new(),
            toolchain: Toolchain::default(),
            hooks: Vec::new(),
            env: BTreeMap::new(),
            native: Vec::new(),
            origins: BTreeMap::new(),
        }
    }

    /// Absorb one payload declared by fragment `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Conflict`] for disagreeing required toolchains.
    pub fn absorb(&mut self, source: &str, payload: &Payload) -> Result<(), ResolveError> {
        union_into(&mut self.tools, &payload.tools);
        if let Some(spec) = &payload.toolchain {
            self.absorb_toolchain(source, spec)?;
        }
        for hook in &payload.hooks {
            self.absorb_hook(source, hook);
        }
        for (key, value) in &payload.env {
            self.absorb_env(source, key, value);
        }
        union_into(&mut self.native, &payload.native);
        Ok(())
    }

    /// Record that `id` took part in the merge.
    pub fn mark_merged(&mut self, id: &str) {
        if !self.fragments.iter().any(|f| f == id) {
            self.fragments.push(id.to_string());
        }
    }

    fn absorb_toolchain(&mut self, source: &str, spec: &ToolchainSpec) -> Result<(), ResolveError> {
        if self.toolchain.required && spec.required == Some(true) && !spec.allow_override {
            self.check_conflict(
                "toolchain.name",
                self.toolchain.name.as_deref(),
                spec.name.as_deref(),
                source,
            )?;
            self.check_conflict(
                "toolchain.channel",
                self.toolchain.channel.as_deref(),
                spec.channel.as_deref(),
                source,
            )?;
        }

        if let Some(name) = &spec.name {
            self.toolchain.name = Some(name.clone());
            record(&mut self.origins, "toolchain.name".to_string(), source);
        }
        if let Some(channel) = &spec.channel {
            self.toolchain.channel = Some(channel.clone());
            record(&mut self.origins, "toolchain.channel".to_string(), source);
        }
        if let Some(required) = spec.required {
            self.toolchain.required = required;
            record(&mut self.origins, "toolchain.required".to_string(), source);
        }
        if spec.name.is_some() || spec.channel.is_some() {
            self.toolchain.overridden = spec.allow_override;
        }
        union_into(&mut self.toolchain.components, &spec.components);
        Ok(())
    }

    fn check_conflict(
        &self,
        field: &str,
        existing: Option<&str>,
        incoming: Option<&str>,
        source: &str,
    ) -> Result<(), ResolveError> {
        match (existing, incoming) {
            (Some(existing), Some(incoming)) if existing != incoming => {
                Err(ResolveError::Conflict {
                    field: field.to_string(),
                    existing_fragment: self.origins.get(field).cloned().unwrap_or_default(),
                    existing: existing.to_string(),
                    incoming_fragment: source.to_string(),
                    incoming: incoming.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn absorb_hook(&mut self, source: &str, decl: &HookDecl) {
        let name = &decl.name;
        if let Some(hook) = self.hooks.iter_mut().find(|h| &h.name == name) {
            if let Some(kind) = &decl.kind {
                hook.kind.clone_from(kind);
                hook.fragment = source.to_string();
            }
            if let Some(enabled) = decl.enabled {
                hook.enabled = enabled;
                record(&mut self.origins, format!("hooks.{name}.enabled"), source);
            }
            for (option, value) in &decl.settings {
                hook.settings.insert(option.clone(), value.clone());
                record(&mut self.origins, format!("hooks.{name}.settings.{option}"), source);
            }
            return;
        }

        if let Some(enabled) = decl.enabled {
            record(&mut self.origins, format!("hooks.{name}.enabled"), source);
            tracing::trace!(hook = %name, enabled, fragment = source, "hook declared");
        }
        for option in decl.settings.keys() {
            record(&mut self.origins, format!("hooks.{name}.settings.{option}"), source);
        }
        self.hooks.push(ResolvedHook {
            name: name.clone(),
            kind: decl.kind().to_string(),
            enabled: decl.enabled.unwrap_or(false),
            settings: decl.settings.clone(),
            fragment: source.to_string(),
        });
    }

    fn absorb_env(&mut self, source: &str, key: &str, value: &str) {
        if let Some(previous) = self.env.insert(key.to_string(), value.to_string())
            && previous != value
        {
            tracing::debug!(key, previous = %previous, value, fragment = source, "env overridden");
        }
        record(&mut self.origins, format!("env.{key}"), source);
    }

    /// Merge another resolved configuration into this one with the same
    /// per-field policy. `other` plays the role of the later fragment and its
    /// origins are carried over. `merge(r, r) == r`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Conflict`] if both sides carry required
    /// toolchains that disagree and `other` did not reach its toolchain
    /// through an override.
    pub fn merge(&self, other: &Self) -> Result<Self, ResolveError> {
        let mut merged = self.clone();

        union_into(&mut merged.tools, &other.tools);

        if self.toolchain.required && other.toolchain.required && !other.toolchain.overridden {
            merged.check_conflict(
                "toolchain.name",
                self.toolchain.name.as_deref(),
                other.toolchain.name.as_deref(),
                other.origin("toolchain.name"),
            )?;
            merged.check_conflict(
                "toolchain.channel",
                self.toolchain.channel.as_deref(),
                other.toolchain.channel.as_deref(),
                other.origin("toolchain.channel"),
            )?;
        }
        if let Some(name) = &other.toolchain.name {
            merged.toolchain.name = Some(name.clone());
            record(&mut merged.origins, "toolchain.name".to_string(), other.origin("toolchain.name"));
        }
        if let Some(channel) = &other.toolchain.channel {
            merged.toolchain.channel = Some(channel.clone());
            record(
                &mut merged.origins,
                "toolchain.channel".to_string(),
                other.origin("toolchain.channel"),
            );
        }
        if let Some(source) = other.origins.get("toolchain.required") {
            merged.toolchain.required = other.toolchain.required;
            record(&mut merged.origins, "toolchain.required".to_string(), source);
        }
        if other.toolchain.name.is_some() || other.toolchain.channel.is_some() {
            merged.toolchain.overridden = other.toolchain.overridden;
        }
        union_into(&mut merged.toolchain.components, &other.toolchain.components);

        for hook in &other.hooks {
            merged.absorb_hook(
                &hook.fragment,
                &HookDecl {
                    name: hook.name.clone(),
                    kind: Some(hook.kind.clone()),
                    ..HookDecl::default()
                },
            );
            let enabled_field = format!("hooks.{}.enabled", hook.name);
            if let Some(source) = other.origins.get(&enabled_field) {
                merged.absorb_hook(
                    source,
                    &HookDecl {
                        name: hook.name.clone(),
                        enabled: Some(hook.enabled),
                        ..HookDecl::default()
                    },
                );
            }
            for (option, value) in &hook.settings {
                let field = format!("hooks.{}.settings.{option}", hook.name);
                merged.absorb_hook(
                    other.origin(&field),
                    &HookDecl {
                        name: hook.name.clone(),
                        settings: Settings::from([(option.clone(), value.clone())]),
                        ..HookDecl::default()
                    },
                );
            }
        }

        for (key, value) in &other.env {
            merged.absorb_env(other.origin(&format!("env.{key}")), key, value);
        }
        union_into(&mut merged.native, &other.native);
        for id in &other.fragments {
            merged.mark_merged(id);
        }
        Ok(merged)
    }

    /// Fragment that last wrote `field`, or the root when unrecorded.
    #[must_use]
    pub fn origin(&self, field: &str) -> &str {
        self.origins.get(field).map_or(self.root.as_str(), String::as_str)
    }

    /// Look a hook up by name.
    #[must_use]
    pub fn hook(&self, name: &str) -> Option<&ResolvedHook> {
        self.hooks.iter().find(|h| h.name == name)
    }

    /// Whether a hook is enabled, disabled or never declared.
    #[must_use]
    pub fn hook_state(&self, name: &str) -> HookState {
        match self.hook(name) {
            Some(h) if h.enabled => HookState::Enabled,
            Some(_) => HookState::Disabled,
            None => HookState::Absent,
        }
    }

    /// Pretty JSON, stable across runs.
    ///
    /// # Errors
    ///
    /// Returns an error if a hook setting cannot be represented as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn platform() -> PlatformId {
        PlatformId::new("x86_64-linux").unwrap()
    }

    fn toolchain(channel: &str, required: bool) -> Payload {
        Payload {
            toolchain: Some(ToolchainSpec {
                name: Some("rust".to_string()),
                channel: Some(channel.to_string()),
                required: Some(required),
                ..ToolchainSpec::default()
            }),
            ..Payload::default()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> Payload {
        Payload {
            env: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..Payload::default()
        }
    }

    fn resolved(steps: &[(&str, Payload)]) -> Result<ResolvedConfig, ResolveError> {
        let mut cfg = ResolvedConfig::new("root", platform());
        for (source, payload) in steps {
            cfg.absorb(source, payload)?;
            cfg.mark_merged(source);
        }
        Ok(cfg)
    }

    #[test]
    fn tools_union_keeps_first_appearance() {
        let a = Payload {
            tools: vec!["git".into(), "jq".into()],
            ..Payload::default()
        };
        let b = Payload {
            tools: vec!["ripgrep".into(), "git".into()],
            ..Payload::default()
        };
        let cfg = resolved(&[("a", a), ("b", b)]).unwrap();
        assert_eq!(cfg.tools, ["git", "jq", "ripgrep"]);
    }

    #[test]
    fn later_channel_overrides_when_not_required() {
        let cfg = resolved(&[("base", toolchain("stable", false)), ("beta", toolchain("beta", false))])
            .unwrap();
        assert_eq!(cfg.toolchain.channel.as_deref(), Some("beta"));
        assert_eq!(cfg.origins["toolchain.channel"], "beta");
    }

    #[test]
    fn required_disagreement_is_a_conflict() {
        let err = resolved(&[("base", toolchain("stable", true)), ("pin", toolchain("nightly", true))])
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::Conflict {
                field: "toolchain.channel".to_string(),
                existing_fragment: "base".to_string(),
                existing: "stable".to_string(),
                incoming_fragment: "pin".to_string(),
                incoming: "nightly".to_string(),
            }
        );
    }

    #[test]
    fn override_flag_resolves_required_disagreement() {
        let mut pin = toolchain("nightly", true);
        if let Some(spec) = pin.toolchain.as_mut() {
            spec.allow_override = true;
        }
        let cfg = resolved(&[("base", toolchain("stable", true)), ("pin", pin)]).unwrap();
        assert_eq!(cfg.toolchain.channel.as_deref(), Some("nightly"));
    }

    #[test]
    fn required_agreement_is_fine() {
        let cfg = resolved(&[("a", toolchain("stable", true)), ("b", toolchain("stable", true))])
            .unwrap();
        assert!(cfg.toolchain.required);
    }

    #[test]
    fn components_are_unioned() {
        let with = |c: &[&str]| Payload {
            toolchain: Some(ToolchainSpec {
                components: c.iter().map(ToString::to_string).collect(),
                ..ToolchainSpec::default()
            }),
            ..Payload::default()
        };
        let cfg = resolved(&[("a", with(&["rustfmt"])), ("b", with(&["clippy", "rustfmt"]))]).unwrap();
        assert_eq!(cfg.toolchain.components, ["rustfmt", "clippy"]);
    }

    #[test]
    fn env_is_last_writer_wins_with_origin() {
        let cfg = resolved(&[
            ("a", env(&[("RUST_LOG", "info"), ("A", "1")])),
            ("b", env(&[("RUST_LOG", "debug")])),
        ])
        .unwrap();
        assert_eq!(cfg.env["RUST_LOG"], "debug");
        assert_eq!(cfg.env["A"], "1");
        assert_eq!(cfg.origins["env.RUST_LOG"], "b");
        assert_eq!(cfg.origins["env.A"], "a");
    }

    #[test]
    fn hook_settings_are_shallow_merged() {
        let mut first = HookDecl::enabled("clippy");
        first.settings.insert("args".into(), json!(["-D", "warnings"]));
        first.settings.insert("entry".into(), json!("cargo clippy"));
        let mut second = HookDecl {
            name: "clippy".into(),
            ..HookDecl::default()
        };
        second.settings.insert("args".into(), json!(["--all-targets"]));

        let cfg = resolved(&[
            (
                "a",
                Payload {
                    hooks: vec![first],
                    ..Payload::default()
                },
            ),
            (
                "b",
                Payload {
                    hooks: vec![second],
                    ..Payload::default()
                },
            ),
        ])
        .unwrap();
        let hook = cfg.hook("clippy").unwrap();
        assert!(hook.enabled);
        assert_eq!(hook.settings["args"], json!(["--all-targets"]));
        assert_eq!(hook.settings["entry"], json!("cargo clippy"));
        assert_eq!(hook.fragment, "a");
    }

    #[test]
    fn hook_without_explicit_flag_is_disabled_but_present() {
        let decl = HookDecl {
            name: "typos".into(),
            ..HookDecl::default()
        };
        let cfg = resolved(&[(
            "a",
            Payload {
                hooks: vec![decl],
                ..Payload::default()
            },
        )])
        .unwrap();
        assert_eq!(cfg.hook_state("typos"), HookState::Disabled);
        assert_eq!(cfg.hook_state("rustfmt"), HookState::Absent);
    }

    #[test]
    fn explicit_disable_overrides_enable() {
        let hooks = |decl: HookDecl| Payload {
            hooks: vec![decl],
            ..Payload::default()
        };
        let cfg = resolved(&[
            ("a", hooks(HookDecl::enabled("nextest"))),
            ("b", hooks(HookDecl::disabled("nextest"))),
        ])
        .unwrap();
        assert_eq!(cfg.hook_state("nextest"), HookState::Disabled);
        assert_eq!(cfg.origins["hooks.nextest.enabled"], "b");
    }

    #[test]
    fn unflagged_redeclaration_keeps_earlier_flag() {
        let hooks = |decl: HookDecl| Payload {
            hooks: vec![decl],
            ..Payload::default()
        };
        let cfg = resolved(&[
            ("a", hooks(HookDecl::enabled("rustfmt"))),
            (
                "b",
                hooks(HookDecl {
                    name: "rustfmt".into(),
                    ..HookDecl::default()
                }),
            ),
        ])
        .unwrap();
        assert_eq!(cfg.hook_state("rustfmt"), HookState::Enabled);
    }

    #[test]
    fn native_deps_are_unioned() {
        let native = |n: &str| Payload {
            native: vec![NativeDep::new(n)],
            ..Payload::default()
        };
        let cfg = resolved(&[("a", native("openssl")), ("b", native("openssl")), ("c", native("zlib"))])
            .unwrap();
        assert_eq!(cfg.native.len(), 2);
    }

    #[test]
    fn merge_with_self_is_identity() {
        let mut hook = HookDecl::enabled("clippy");
        hook.settings.insert("args".into(), json!(["-D", "warnings"]));
        let cfg = resolved(&[
            ("base", toolchain("stable", true)),
            ("env", env(&[("RUST_LOG", "info")])),
            (
                "hooks",
                Payload {
                    hooks: vec![hook, HookDecl {
                        name: "typos".into(),
                        ..HookDecl::default()
                    }],
                    tools: vec!["git".into()],
                    native: vec![NativeDep::new("openssl")],
                    ..Payload::default()
                },
            ),
        ])
        .unwrap();
        assert_eq!(cfg.merge(&cfg).unwrap(), cfg);
    }

    #[test]
    fn merge_is_associative_for_disjoint_keys() {
        let with_hook = |var: &str, value: &str, hook: HookDecl| {
            let mut payload = env(&[(var, value)]);
            payload.hooks.push(hook);
            payload
        };
        let mut typos = HookDecl::enabled("typos");
        typos.settings.insert("files".into(), json!("*.md"));
        let a = resolved(&[("a", with_hook("A", "1", HookDecl::enabled("rustfmt")))]).unwrap();
        let b = resolved(&[("b", with_hook("B", "2", HookDecl::disabled("clippy")))]).unwrap();
        let c = resolved(&[("c", with_hook("C", "3", typos))]).unwrap();
        let left = a.merge(&b).unwrap().merge(&c).unwrap();
        let right = a.merge(&b.merge(&c).unwrap()).unwrap();
        assert_eq!(left.env, right.env);
        assert_eq!(left.hooks, right.hooks);
        assert_eq!(left.origins, right.origins);
        assert_eq!(left.fragments, right.fragments);
        assert_eq!(left, right);
        let names: Vec<&str> = left.hooks.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["rustfmt", "clippy", "typos"]);
    }

    #[test]
    fn merge_honours_override_from_separate_resolution() {
        let pin = Payload {
            toolchain: Some(ToolchainSpec {
                allow_override: true,
                ..toolchain("nightly", true).toolchain.unwrap()
            }),
            ..Payload::default()
        };
        let base = resolved(&[("base", toolchain("stable", true))]).unwrap();
        let pinned = resolved(&[("pin", pin.clone())]).unwrap();
        assert!(pinned.toolchain.overridden);

        let merged = base.merge(&pinned).unwrap();
        let folded = resolved(&[("base", toolchain("stable", true)), ("pin", pin)]).unwrap();
        assert_eq!(merged.toolchain, folded.toolchain);
        assert_eq!(merged.toolchain.channel.as_deref(), Some("nightly"));
        assert_eq!(merged.origin("toolchain.channel"), "pin");
    }

    #[test]
    fn plain_redeclaration_clears_override_provenance() {
        let pin = Payload {
            toolchain: Some(ToolchainSpec {
                allow_override: true,
                ..toolchain("nightly", true).toolchain.unwrap()
            }),
            ..Payload::default()
        };
        let cfg = resolved(&[("pin", pin), ("later", toolchain("nightly", true))]).unwrap();
        assert!(!cfg.toolchain.overridden);
        let base = resolved(&[("base", toolchain("stable", true))]).unwrap();
        assert!(matches!(base.merge(&cfg), Err(ResolveError::Conflict { .. })));
    }

    #[test]
    fn merge_carries_conflicts() {
        let a = resolved(&[("a", toolchain("stable", true))]).unwrap();
        let b = resolved(&[("b", toolchain("beta", true))]).unwrap();
        assert!(matches!(a.merge(&b), Err(ResolveError::Conflict { .. })));
    }

    #[test]
    fn json_is_deterministic() {
        let cfg = resolved(&[("a", env(&[("Z", "1"), ("A", "2")]))]).unwrap();
        let first = cfg.to_json().unwrap();
        assert_eq!(first, cfg.clone().to_json().unwrap());
        assert!(first.find("\"A\"").unwrap() < first.find("\"Z\"").unwrap());
        let back: ResolvedConfig = serde_json::from_str(&first).unwrap();
        assert_eq!(back, cfg);
    }
}
