//! Code-reference resolution
//!
//! A [`ResolverContext`] is the ordered list of directories in which a task's
//! named code references (executables, helper programs) are looked up. It is
//! built once by the bootstrap and handed to the materializer; nothing here
//! touches process-global state.

use std::env;
use std::path::{Path, PathBuf};

use tracing::trace;

/// Ordered search path for code references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverContext {
    search_path: Vec<PathBuf>,
}

impl ResolverContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with the entries of the ambient `PATH`
    pub fn from_env() -> Self {
        let search_path = env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self { search_path }
    }

    /// Add a directory with the lowest priority
    pub fn append(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.search_path.contains(&dir) {
            self.search_path.push(dir);
        }
    }

    /// Add a directory with the highest priority
    ///
    /// A directory that is already present is moved to the front.
    pub fn prepend(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        self.search_path.retain(|d| d != &dir);
        self.search_path.insert(0, dir);
    }

    /// Directories in lookup order
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Resolve a bare name to the first matching file in the search path
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.search_path.iter().find_map(|dir| {
            let candidate = dir.join(name);
            trace!(candidate = %candidate.display(), "Probing resolver path");
            is_executable(&candidate).then_some(candidate)
        })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
