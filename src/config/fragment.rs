//! Declarative fragment types as they appear in TOML.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::predicate::Predicate;

/// Hook settings: option name to arbitrary TOML/JSON value, sorted by name.
pub type Settings = BTreeMap<String, serde_json::Value>;

/// A named, partial environment specification.
///
/// ```toml
/// id = "rust"
/// imports = ["hooks"]
/// tools = ["cargo-watch", "sqlx-cli"]
///
/// [toolchain]
/// name = "rust"
/// channel = "stable"
/// components = ["rustfmt", "clippy"]
///
/// [env]
/// SQLX_OFFLINE = "true"
///
/// [[conditional]]
/// when = { family = "darwin" }
/// native = [{ name = "darwin.apple_sdk.frameworks.Security" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Unique id; loaders default it to the file stem.
    #[serde(default)]
    pub id: String,
    /// Ids of fragments merged after this one, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    /// Unconditional contents.
    #[serde(flatten)]
    pub payload: Payload,
    /// Platform-conditional contents, evaluated in declaration order.
    #[serde(default, rename = "conditional", skip_serializing_if = "Vec::is_empty")]
    pub conditionals: Vec<Conditional>,
}

impl Fragment {
    /// Create an empty fragment with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Keys the fragment file set that no field recognises.
    ///
    /// Keys inside `[[conditional]]` entries are reported as
    /// `conditional[<index>].<key>`.
    #[must_use]
    pub fn unknown_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.payload.unknown.keys().cloned().collect();
        for (index, conditional) in self.conditionals.iter().enumerate() {
            keys.extend(
                conditional
                    .payload
                    .unknown
                    .keys()
                    .map(|key| format!("conditional[{index}].{key}")),
            );
        }
        keys
    }
}

/// The mergeable body shared by fragments and conditional entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Tools placed on the developer shell's `PATH`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Toolchain name, channel and components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<ToolchainSpec>,
    /// Quality-gate hooks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookDecl>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Native libraries linked into build targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub native: Vec<NativeDep>,
    /// Keys no other field claimed. Loaders reject a fragment that has any.
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub unknown: BTreeMap<String, toml::Value>,
}

impl Payload {
    /// Whether the payload contributes nothing to a merge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
            && self.toolchain.is_none()
            && self.hooks.is_empty()
            && self.env.is_empty()
            && self.native.is_empty()
    }
}

/// A payload guarded by an optional platform predicate.
///
/// An entry without `when` is unconditional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// Guard; `None` always applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Predicate>,
    /// Contents merged when the guard holds.
    #[serde(flatten)]
    pub payload: Payload,
}

/// Language toolchain declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainSpec {
    /// Toolchain name, e.g. `rust`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Release channel, e.g. `stable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Extra components; unioned across fragments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// Marks `name` and `channel` as mandatory. Two required declarations
    /// that disagree are a conflict unless the later one sets `override`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Deliberately replace an earlier required declaration.
    #[serde(default, rename = "override", skip_serializing_if = "std::ops::Not::not")]
    pub allow_override: bool,
}

/// A quality-gate hook declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookDecl {
    /// Hook name, unique within a resolved configuration.
    pub name: String,
    /// Registered hook kind; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Explicit toggle. Unset leaves an earlier decision in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Free-form options such as `entry`, `args` and `files`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: Settings,
}

impl HookDecl {
    /// Create an enabled hook whose kind equals its name.
    #[must_use]
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: Some(true),
            ..Self::default()
        }
    }

    /// Create an explicitly disabled hook whose kind equals its name.
    #[must_use]
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: Some(false),
            ..Self::default()
        }
    }

    /// The effective kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.name)
    }
}

/// A native library linked into build targets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeDep {
    /// Library or package attribute name.
    pub name: String,
    /// Target names this library applies to; empty means every target.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

impl NativeDep {
    /// A library that applies to every target.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: Vec::new(),
        }
    }

    /// Whether this library belongs in the closure of `target`.
    #[must_use]
    pub fn applies_to(&self, target: &str) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| t == target)
    }
}
