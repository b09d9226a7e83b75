//! Resolution: import graph, merge, and memoization.
//!
//! [`resolve`] is the pure entry point. [`Resolver`] wraps it with an
//! in-memory memo and an optional [`DiskCache`], both keyed by
//! [`CacheKey`]. Caching never changes results.
pub mod cache;
pub mod graph;
pub mod merge;

use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub use cache::DiskCache;
pub use merge::{HookState, ResolvedConfig, ResolvedHook, Toolchain};

use crate::config::{FragmentSet, predicate};
use crate::error::ResolveError;
use crate::platform::PlatformId;

/// Merge the root fragment of `set` with its transitive imports for one
/// platform.
///
/// Conditional entries are filtered for `platform` before merging, so the
/// merge itself never looks at the platform.
///
/// # Errors
///
/// Returns [`ResolveError::Cycle`], [`ResolveError::UnknownFragment`] or
/// [`ResolveError::Conflict`].
pub fn resolve(set: &FragmentSet, platform: &PlatformId) -> Result<ResolvedConfig, ResolveError> {
    let order = graph::merge_order(set)?;
    tracing::debug!(platform = %platform, order = ?order, "merging fragments");

    let mut config = ResolvedConfig::new(set.root_id(), platform.clone());
    for id in &order {
        let Some(fragment) = set.get(id) else {
            continue;
        };
        let effective = predicate::effective(fragment, platform);
        for payload in effective.payloads {
            config.absorb(effective.id, payload)?;
        }
        config.mark_merged(id);
    }
    Ok(config)
}

/// Memo key: fragment set content hash plus platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// [`FragmentSet::content_hash`] of the resolved set.
    pub content_hash: String,
    /// Platform resolved for.
    pub platform: PlatformId,
}

/// Memoizing resolver, safe to share across threads.
#[derive(Debug, Default)]
pub struct Resolver {
    memo: Mutex<HashMap<CacheKey, Arc<ResolvedConfig>>>,
    disk: Option<DiskCache>,
}

impl Resolver {
    /// A resolver with an empty memo and no disk cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also persist results to `disk`.
    #[must_use]
    pub fn with_disk_cache(mut self, disk: DiskCache) -> Self {
        self.disk = Some(disk);
        self
    }

    /// Resolve, reusing an earlier result for identical input.
    ///
    /// # Errors
    ///
    /// See [`resolve`]. Errors are not cached.
    pub fn resolve(
        &self,
        set: &FragmentSet,
        platform: &PlatformId,
    ) -> Result<Arc<ResolvedConfig>, ResolveError> {
        let key = match set.content_hash() {
            Ok(content_hash) => CacheKey {
                content_hash,
                platform: platform.clone(),
            },
            Err(e) => {
                tracing::debug!(error = %e, "fragment set is not hashable; skipping cache");
                return resolve(set, platform).map(Arc::new);
            }
        };

        if let Some(hit) = self.lock().get(&key) {
            tracing::trace!(platform = %platform, "memo hit");
            return Ok(Arc::clone(hit));
        }

        let config = match self.disk.as_ref().and_then(|d| d.load(&key)) {
            Some(config) => {
                tracing::debug!(platform = %platform, "disk cache hit");
                config
            }
            None => {
                let config = resolve(set, platform)?;
                if let Some(disk) = &self.disk
                    && let Err(e) = disk.store(&key, &config)
                {
                    tracing::debug!(error = %e, "could not write cache entry");
                }
                config
            }
        };

        let config = Arc::new(config);
        self.lock().insert(key, Arc::clone(&config));
        Ok(config)
    }

    /// Resolve several platforms concurrently. Each result is independent;
    /// a failure on one platform leaves the others untouched.
    pub fn resolve_many(
        &self,
        set: &FragmentSet,
        platforms: &[PlatformId],
    ) -> Vec<(PlatformId, Result<Arc<ResolvedConfig>, ResolveError>)> {
        platforms
            .par_iter()
            .map(|platform| (platform.clone(), self.resolve(set, platform)))
            .collect()
    }

    /// Number of memoized results.
    #[must_use]
    pub fn memoized(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<ResolvedConfig>>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{Conditional, Fragment, NativeDep, Payload, Predicate};

    fn platform(tag: &str) -> PlatformId {
        PlatformId::new(tag).unwrap()
    }

    fn sample_set() -> FragmentSet {
        let mut root = Fragment::new("root");
        root.imports = vec!["darwin".to_string()];
        root.payload.tools = vec!["git".to_string()];
        let mut darwin = Fragment::new("darwin");
        darwin.conditionals.push(Conditional {
            when: Some(Predicate::Family("darwin".to_string())),
            payload: Payload {
                native: vec![NativeDep::new("Security")],
                ..Payload::default()
            },
        });
        FragmentSet::new(root).with(darwin).unwrap()
    }

    #[test]
    fn darwin_entries_stay_off_linux() {
        let set = sample_set();
        let linux = resolve(&set, &platform("x86_64-linux")).unwrap();
        let mac = resolve(&set, &platform("aarch64-darwin")).unwrap();
        assert!(linux.native.is_empty());
        assert_eq!(mac.native, [NativeDep::new("Security")]);
        assert_eq!(linux.fragments, ["root", "darwin"]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let set = sample_set();
        let p = platform("aarch64-darwin");
        assert_eq!(
            resolve(&set, &p).unwrap().to_json().unwrap(),
            resolve(&set, &p).unwrap().to_json().unwrap()
        );
    }

    #[test]
    fn resolver_memoizes_per_platform() {
        let set = sample_set();
        let resolver = Resolver::new();
        let p = platform("x86_64-linux");
        let first = resolver.resolve(&set, &p).unwrap();
        let second = resolver.resolve(&set, &p).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        resolver.resolve(&set, &platform("aarch64-darwin")).unwrap();
        assert_eq!(resolver.memoized(), 2);
    }

    #[test]
    fn resolver_uses_disk_cache() {
        let dir = tempfile::tempdir().unwrap();
        let set = sample_set();
        let p = platform("aarch64-darwin");
        let cold = Resolver::new()
            .with_disk_cache(DiskCache::new(dir.path()))
            .resolve(&set, &p)
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        let warm = Resolver::new()
            .with_disk_cache(DiskCache::new(dir.path()))
            .resolve(&set, &p)
            .unwrap();
        assert_eq!(cold, warm);
    }

    #[test]
    fn resolve_many_isolates_failures() {
        let set = sample_set();
        let platforms = vec![platform("x86_64-linux"), platform("aarch64-darwin")];
        let results = Resolver::new().resolve_many(&set, &platforms);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(results[0].0, platforms[0]);
    }

    #[test]
    fn cycle_fails_on_every_platform() {
        let mut a = Fragment::new("a");
        a.imports = vec!["b".to_string()];
        let mut b = Fragment::new("b");
        b.imports = vec!["a".to_string()];
        let set = FragmentSet::new(a).with(b).unwrap();
        for tag in ["x86_64-linux", "aarch64-darwin", "x86_64-windows"] {
            let err = resolve(&set, &platform(tag)).unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("a -> b -> a"), "{tag}: {msg}");
        }
    }
}
