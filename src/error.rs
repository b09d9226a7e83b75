//! Domain-specific error types for the resolution engine.
//!
//! Library modules return typed errors built with [`thiserror`]; command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! ConfigError          reading fragments, unknown keys, platform tags
//! ResolveError         cycles, conflicts, hooks, targets
//! └── ToolRepository(ToolRepositoryError)
//! ```
//!
//! Every resolution error names the fragment and the field that caused it so
//! a broken configuration can be fixed without reading engine internals.

use thiserror::Error;

/// Errors that arise while loading fragment files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A fragment file could not be read.
    #[error("IO error reading fragment file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A fragment file is not valid TOML or has the wrong shape.
    #[error("Invalid fragment file {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Parser message, including line and column.
        message: String,
    },

    /// A fragment file sets keys that no field recognises.
    #[error("Unknown key(s) in {path}: {}", .keys.join(", "))]
    UnknownKeys {
        /// Path to the offending file.
        path: String,
        /// Dotted key names, in file order.
        keys: Vec<String>,
    },

    /// Two fragments share an id.
    #[error("Duplicate fragment id '{id}' (declared in {first} and {second})")]
    DuplicateFragment {
        /// The repeated id.
        id: String,
        /// Where the id was first seen.
        first: String,
        /// Where it was seen again.
        second: String,
    },

    /// A platform tag is empty or malformed.
    #[error("Invalid platform identifier '{0}'")]
    InvalidPlatform(String),
}

/// Errors that fail a single resolution request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The import graph contains a cycle.
    #[error("Import cycle detected: {}", .cycle.join(" -> "))]
    Cycle {
        /// Fragment ids along the cycle; the first id is repeated at the end.
        cycle: Vec<String>,
    },

    /// An import names a fragment that is not part of the set.
    #[error("Fragment '{referenced_by}' imports unknown fragment '{id}'")]
    UnknownFragment {
        /// The missing fragment id.
        id: String,
        /// Fragment that declared the import.
        referenced_by: String,
    },

    /// Two required toolchain declarations disagree with no override.
    #[error(
        "Conflicting values for {field}: '{existing}' (from fragment '{existing_fragment}') \
         and '{incoming}' (from fragment '{incoming_fragment}'); set override = true on the later one"
    )]
    Conflict {
        /// Dotted field path, e.g. `toolchain.channel`.
        field: String,
        /// Fragment holding the current value.
        existing_fragment: String,
        /// Current value.
        existing: String,
        /// Fragment attempting to replace it.
        incoming_fragment: String,
        /// Replacement value.
        incoming: String,
    },

    /// A hook references a kind the registry does not know.
    #[error("Hook '{hook}' (fragment '{fragment}') references unknown hook kind '{kind}'")]
    UnknownHook {
        /// Hook name.
        hook: String,
        /// Requested kind.
        kind: String,
        /// Fragment that declared the hook.
        fragment: String,
    },

    /// No toolchain or target rule matches the platform.
    #[error("Target '{target}' is not supported on platform '{platform}': {reason}")]
    UnsupportedPlatform {
        /// Platform tag.
        platform: String,
        /// Target being composed.
        target: String,
        /// Why the platform was rejected.
        reason: String,
    },

    /// The project asks for a target name the composer does not know.
    #[error("Unknown build target '{name}' (known: {known})")]
    UnknownTarget {
        /// Requested target name.
        name: String,
        /// Comma-separated list of known names.
        known: String,
    },

    /// Propagated from the external tool repository.
    #[error(transparent)]
    ToolRepository(#[from] ToolRepositoryError),
}

/// Errors reported by a [`ToolRepository`](crate::tools::ToolRepository).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolRepositoryError {
    /// The tool is not available.
    #[error("Tool '{tool}' not found in the tool repository")]
    NotFound {
        /// Tool identifier.
        tool: String,
    },

    /// The lookup itself failed.
    #[error("Lookup of tool '{tool}' failed: {message}")]
    Lookup {
        /// Tool identifier.
        tool: String,
        /// Underlying failure.
        message: String,
    },
}
