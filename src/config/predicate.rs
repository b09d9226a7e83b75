//! Platform predicate evaluation.
//!
//! Runs as a standalone pass before merging: each fragment is reduced to the
//! explicit list of payloads that apply to one platform, so no later stage
//! has to branch on the platform itself.
use serde::{Deserialize, Serialize};

use super::fragment::{Conditional, Fragment, Payload};
use crate::platform::PlatformId;

/// A pure boolean function of a platform identifier.
///
/// ```toml
/// when = { family = "darwin" }
/// when = { any = [{ arch = "aarch64" }, { platform = "x86_64-linux" }] }
/// when = { not = { family = "windows" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// OS family: `linux`, `darwin`, `windows` or `unix`.
    Family(String),
    /// CPU architecture, aliases allowed (`arm64` = `aarch64`).
    Arch(String),
    /// Exact platform tag.
    Platform(String),
    /// True if any inner predicate is true.
    Any(Vec<Predicate>),
    /// True if every inner predicate is true.
    All(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

/// Match mode for predicate combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// All predicates must hold (AND logic).
    All,
    /// Any predicate must hold (OR logic).
    Any,
}

impl Predicate {
    /// Evaluate against a platform.
    #[must_use]
    pub fn evaluate(&self, platform: &PlatformId) -> bool {
        match self {
            Self::Family(family) => platform.is_family(family),
            Self::Arch(arch) => platform.is_arch(arch),
            Self::Platform(tag) => platform.as_str() == tag,
            Self::Any(inner) => matches(inner, platform, MatchMode::Any),
            Self::All(inner) => matches(inner, platform, MatchMode::All),
            Self::Not(inner) => !inner.evaluate(platform),
        }
    }
}

/// Combine several predicates with AND or OR logic.
///
/// An empty list is vacuously true for [`MatchMode::All`] and false for
/// [`MatchMode::Any`].
#[must_use]
pub fn matches(predicates: &[Predicate], platform: &PlatformId, mode: MatchMode) -> bool {
    match mode {
        MatchMode::All => predicates.iter().all(|p| p.evaluate(platform)),
        MatchMode::Any => predicates.iter().any(|p| p.evaluate(platform)),
    }
}

/// Whether a conditional entry applies. Entries without a predicate always do.
#[must_use]
pub fn applies(entry: &Conditional, platform: &PlatformId) -> bool {
    entry.when.as_ref().is_none_or(|p| p.evaluate(platform))
}

/// Return the payloads of the entries that apply to `platform`, in order.
pub fn select<'a>(entries: &'a [Conditional], platform: &PlatformId) -> Vec<&'a Payload> {
    entries
        .iter()
        .filter(|entry| applies(entry, platform))
        .map(|entry| &entry.payload)
        .collect()
}

/// A fragment reduced to the payloads that apply to one platform.
#[derive(Debug, Clone)]
pub struct EffectiveFragment<'a> {
    /// Id of the source fragment.
    pub id: &'a str,
    /// The unconditional payload followed by every matching conditional payload.
    pub payloads: Vec<&'a Payload>,
}

/// Filter a fragment for one platform.
#[must_use]
pub fn effective<'a>(fragment: &'a Fragment, platform: &PlatformId) -> EffectiveFragment<'a> {
    let mut payloads = vec![&fragment.payload];
    payloads.extend(select(&fragment.conditionals, platform));
    EffectiveFragment {
        id: &fragment.id,
        payloads,
    }
}
