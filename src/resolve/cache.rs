//! On-disk JSON cache of resolved configurations.
//!
//! Entries are keyed by the fragment set's content hash, the platform tag and
//! the engine version, so editing a fragment or upgrading the binary produces
//! a new key. Read failures are treated as misses.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CacheKey;
use super::merge::ResolvedConfig;

/// Directory of cached [`ResolvedConfig`]s, one JSON file per key.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    version: String,
}

impl DiskCache {
    /// A cache in `dir` for entries written by this engine version.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            version: crate::VERSION.to_string(),
        }
    }

    /// Override the engine version that entries are keyed by.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// `$XDG_CACHE_HOME/envresolve/resolved/`, if it can be created.
    #[must_use]
    pub fn user_default() -> Option<Self> {
        let dir = crate::logging::cache_dir()?.join("resolved");
        fs::create_dir_all(&dir).ok()?;
        Some(Self::new(dir))
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!(
            "{}-{}-{}.json",
            key.content_hash,
            file_safe(key.platform.as_str()),
            file_safe(&self.version)
        ))
    }

    /// Load a cached entry. Corrupt or mismatched entries are misses.
    #[must_use]
    pub fn load(&self, key: &CacheKey) -> Option<ResolvedConfig> {
        let path = self.path(key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<ResolvedConfig>(&content) {
            Ok(config) if config.platform == key.platform => Some(config),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Write an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn store(&self, key: &CacheKey, config: &ResolvedConfig) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(config).map_err(io::Error::other)?;
        fs::write(self.path(key), json)
    }
}

fn file_safe(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
