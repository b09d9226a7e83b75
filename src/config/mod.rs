//! Project configuration: fragment files, predicates, loading and validation.
pub mod fragment;
pub mod predicate;
pub mod toml_loader;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use fragment::{Conditional, Fragment, HookDecl, NativeDep, Payload, Settings, ToolchainSpec};
pub use predicate::Predicate;

use crate::error::ConfigError;
use crate::targets::ProjectDescriptor;

/// Project file at the repository root.
pub const PROJECT_FILE: &str = "envresolve.toml";

/// Directory holding importable fragments, one per file.
pub const FRAGMENTS_DIR: &str = "fragments";

/// Id given to the root fragment when `envresolve.toml` does not set one.
pub const DEFAULT_ROOT_ID: &str = "root";

/// Shape of `envresolve.toml`: a `[project]` table plus the root fragment.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    project: ProjectDescriptor,
    #[serde(flatten)]
    fragment: Fragment,
}

/// The fragments taking part in one resolution, keyed by id.
///
/// Fragments are never mutated once inserted; resolution borrows them.
#[derive(Debug, Clone)]
pub struct FragmentSet {
    root: String,
    fragments: BTreeMap<String, Fragment>,
    sources: BTreeMap<String, String>,
}

/// Hashed view of a set; excludes source labels so moving a file does not
/// invalidate caches.
#[derive(Serialize)]
struct HashView<'a> {
    root: &'a str,
    fragments: &'a BTreeMap<String, Fragment>,
}

impl FragmentSet {
    /// Create a set whose root is `root`.
    #[must_use]
    pub fn new(root: Fragment) -> Self {
        let id = root.id.clone();
        let mut sources = BTreeMap::new();
        sources.insert(id.clone(), "<root>".to_string());
        let mut fragments = BTreeMap::new();
        fragments.insert(id.clone(), root);
        Self {
            root: id,
            fragments,
            sources,
        }
    }

    /// Add a fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateFragment`] if the id is taken.
    pub fn insert(&mut self, fragment: Fragment) -> Result<(), ConfigError> {
        self.insert_from(fragment, "<memory>")
    }

    /// Add a fragment, remembering where it came from for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateFragment`] if the id is taken.
    pub fn insert_from(
        &mut self,
        fragment: Fragment,
        source: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let source = source.into();
        if let Some(first) = self.sources.get(&fragment.id) {
            return Err(ConfigError::DuplicateFragment {
                id: fragment.id,
                first: first.clone(),
                second: source,
            });
        }
        self.sources.insert(fragment.id.clone(), source);
        self.fragments.insert(fragment.id.clone(), fragment);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateFragment`] if the id is taken.
    pub fn with(mut self, fragment: Fragment) -> Result<Self, ConfigError> {
        self.insert(fragment)?;
        Ok(self)
    }

    /// Id of the root fragment.
    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// The root fragment.
    #[must_use]
    pub fn root(&self) -> Option<&Fragment> {
        self.fragments.get(&self.root)
    }

    /// Look a fragment up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Fragment> {
        self.fragments.get(id)
    }

    /// Where the fragment was loaded from.
    #[must_use]
    pub fn source_of(&self, id: &str) -> Option<&str> {
        self.sources.get(id).map(String::as_str)
    }

    /// Fragments in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    /// Number of fragments, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the set holds no fragments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Lowercase hex SHA-256 over the canonical JSON form of the set.
    ///
    /// # Errors
    ///
    /// Returns an error if a hook setting cannot be represented as JSON.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        use sha2::{Digest, Sha256};

        let serialized = serde_json::to_string(&HashView {
            root: &self.root,
            fragments: &self.fragments,
        })?;
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Everything loaded from a project directory.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Directory holding `envresolve.toml`.
    pub root_dir: PathBuf,
    /// The `[project]` table.
    pub project: ProjectDescriptor,
    /// Root fragment plus every file under `fragments/`.
    pub fragments: FragmentSet,
}

impl ProjectConfig {
    /// Load `envresolve.toml` and every `fragments/*.toml` under `root_dir`.
    ///
    /// Fragment files are read in file-name order. A fragment without an
    /// `id` takes its file stem.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed, or if two
    /// fragments share an id.
    pub fn load(root_dir: &Path) -> Result<Self, ConfigError> {
        let project_path = root_dir.join(PROJECT_FILE);
        let mut file: ProjectFile = toml_loader::load_config(&project_path)?;
        reject_unknown_keys(&file.fragment, &project_path)?;
        if file.fragment.id.is_empty() {
            file.fragment.id = DEFAULT_ROOT_ID.to_string();
        }
        let root_label = PROJECT_FILE.to_string();
        let mut fragments = FragmentSet::new(file.fragment);
        fragments
            .sources
            .insert(fragments.root.clone(), root_label);

        for path in toml_loader::toml_files(&root_dir.join(FRAGMENTS_DIR))? {
            let mut fragment: Fragment = toml_loader::load_config(&path)?;
            reject_unknown_keys(&fragment, &path)?;
            if fragment.id.is_empty() {
                fragment.id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }
            let label = format!(
                "{FRAGMENTS_DIR}/{}",
                path.file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            );
            tracing::debug!(id = %fragment.id, source = %label, "loaded fragment");
            fragments.insert_from(fragment, label)?;
        }

        Ok(Self {
            root_dir: root_dir.to_path_buf(),
            project: file.project,
            fragments,
        })
    }
}

fn reject_unknown_keys(fragment: &Fragment, path: &Path) -> Result<(), ConfigError> {
    let keys = fragment.unknown_keys();
    if keys.is_empty() {
        return Ok(());
    }
    Err(ConfigError::UnknownKeys {
        path: path.display().to_string(),
        keys,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut set = FragmentSet::new(Fragment::new("root"));
        set.insert(Fragment::new("rust")).unwrap();
        let err = set.insert(Fragment::new("rust")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFragment { ref id, .. } if id == "rust"));
    }

    #[test]
    fn content_hash_is_stable_and_sensitive() {
        let a = FragmentSet::new(Fragment::new("root"))
            .with(Fragment::new("rust"))
            .unwrap();
        let b = FragmentSet::new(Fragment::new("root"))
            .with(Fragment::new("rust"))
            .unwrap();
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
        assert_eq!(a.content_hash().unwrap().len(), 64);

        let mut changed = Fragment::new("rust");
        changed.payload.tools.push("cargo-watch".to_string());
        let c = FragmentSet::new(Fragment::new("root")).with(changed).unwrap();
        assert_ne!(a.content_hash().unwrap(), c.content_hash().unwrap());
    }

    #[test]
    fn load_reads_project_and_fragments() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            PROJECT_FILE,
            r#"
imports = ["rust"]
tools = ["git"]

[project]
name = "demo"
offline = true
"#,
        );
        write(
            dir.path(),
            "fragments/rust.toml",
            "[toolchain]\nname = \"rust\"\nchannel = \"stable\"\n",
        );

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.project.name, "demo");
        assert!(config.project.offline);
        assert_eq!(config.fragments.root_id(), DEFAULT_ROOT_ID);
        assert_eq!(config.fragments.len(), 2);
        let root = config.fragments.root().unwrap();
        assert_eq!(root.imports, ["rust"]);
        assert_eq!(root.payload.tools, ["git"]);
        let rust = config.fragments.get("rust").unwrap();
        assert_eq!(
            rust.payload.toolchain.as_ref().unwrap().channel.as_deref(),
            Some("stable")
        );
        assert_eq!(config.fragments.source_of("rust"), Some("fragments/rust.toml"));
    }

    #[test]
    fn load_detects_duplicate_ids_across_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PROJECT_FILE, "");
        write(dir.path(), "fragments/a.toml", "id = \"shared\"\n");
        write(dir.path(), "fragments/b.toml", "id = \"shared\"\n");
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duplicate fragment id 'shared' (declared in fragments/a.toml and fragments/b.toml)"
        );
    }

    #[test]
    fn load_rejects_misspelled_root_keys() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            PROJECT_FILE,
            "tool = [\"git\"]\n\n[toolchian]\nname = \"rust\"\nchannel = \"stable\"\n",
        );
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownKeys { ref keys, ref path }
                if keys == &["tool", "toolchian"] && path.ends_with(PROJECT_FILE)
        ));
    }

    #[test]
    fn load_rejects_misspelled_hook_flag() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PROJECT_FILE, "imports = [\"hooks\"]\n");
        write(
            dir.path(),
            "fragments/hooks.toml",
            "[[hooks]]\nname = \"clippy\"\nenable = true\n",
        );
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let msg = err.to_string();
        assert!(msg.contains("hooks.toml"));
        assert!(msg.contains("enable"));
    }

    #[test]
    fn load_rejects_unknown_project_key() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PROJECT_FILE, "[project]\nname = \"demo\"\nsystem = [\"x86_64-linux\"]\n");
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("system"));
    }

    #[test]
    fn load_rejects_unknown_conditional_key_in_fragment() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PROJECT_FILE, "");
        write(
            dir.path(),
            "fragments/darwin.toml",
            "[[conditional]]\nwhen = { family = \"darwin\" }\nnatives = [\"Security\"]\n",
        );
        assert_eq!(
            ProjectConfig::load(dir.path()).unwrap_err().to_string(),
            format!(
                "Unknown key(s) in {}: conditional[0].natives",
                dir.path().join("fragments/darwin.toml").display()
            )
        );
    }

    #[test]
    fn load_without_project_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProjectConfig::load(dir.path()).unwrap_err(),
            ConfigError::Io { .. }
        ));
    }
}
