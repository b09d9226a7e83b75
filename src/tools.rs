//! Lookup of tool binaries.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ToolRepositoryError;

/// Maps a tool identifier to an executable path.
#[cfg_attr(test, mockall::automock)]
pub trait ToolRepository: Send + Sync {
    /// Locate the executable for `tool`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRepositoryError::NotFound`] if the tool is unavailable.
    fn locate(&self, tool: &str) -> Result<PathBuf, ToolRepositoryError>;
}

/// Package names whose executable has a different name.
const ALIASES: &[(&str, &str)] = &[
    ("sqlx-cli", "sqlx"),
    ("ripgrep", "rg"),
    ("taplo-cli", "taplo"),
    ("fd-find", "fd"),
];

/// Searches `PATH` (or an explicit search path) with the `which` crate.
#[derive(Debug, Clone)]
pub struct PathRepository {
    search_path: Option<std::ffi::OsString>,
    aliases: HashMap<String, String>,
}

impl PathRepository {
    /// Search the process `PATH` with the built-in package aliases.
    #[must_use]
    pub fn new() -> Self {
        Self {
            search_path: None,
            aliases: ALIASES
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Search only the given directories.
    #[must_use]
    pub fn with_search_path(mut self, dirs: &[&Path]) -> Self {
        self.search_path = std::env::join_paths(dirs).ok();
        self
    }

    /// Executable name for a tool identifier.
    #[must_use]
    pub fn executable_name<'a>(&'a self, tool: &'a str) -> &'a str {
        self.aliases.get(tool).map_or(tool, String::as_str)
    }
}

impl Default for PathRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRepository for PathRepository {
    fn locate(&self, tool: &str) -> Result<PathBuf, ToolRepositoryError> {
        let binary = self.executable_name(tool);
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().map_err(|e| ToolRepositoryError::Lookup {
                    tool: tool.to_string(),
                    message: e.to_string(),
                })?;
                which::which_in(binary, Some(paths), cwd)
            }
            None => which::which(binary),
        };
        match found {
            Ok(path) => Ok(path),
            Err(which::Error::CannotFindBinaryPath) => Err(ToolRepositoryError::NotFound {
                tool: tool.to_string(),
            }),
            Err(e) => Err(ToolRepositoryError::Lookup {
                tool: tool.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
