//! Inclusion Expander
//!
//! Resolves `#include` targets and loads their lines for splicing.

use std::path::{Path, PathBuf};
use tracing::debug;

use moddep_core::{Error, Line, Location, Result};

use crate::read_source;

/// Include file resolver
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    /// Include search paths, in priority order
    search_paths: Vec<PathBuf>,
}

impl IncludeResolver {
    /// Create a resolver with the given search paths
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        let mut resolver = Self::default();
        for path in search_paths {
            resolver.add_search_path(path);
        }
        resolver
    }

    /// Add a search path; duplicates keep their first position
    pub fn add_search_path(&mut self, path: PathBuf) {
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    /// Get all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Resolve an include target.
    ///
    /// The including file's directory is tried first, then each search path in order.
    pub fn resolve(&self, name: &str, from_file: &Path) -> Option<PathBuf> {
        let parent = from_file.parent().unwrap_or(Path::new(""));
        let relative_path = parent.join(name);
        if relative_path.is_file() {
            debug!("Resolved {} relative to {:?}", name, from_file);
            return Some(relative_path);
        }

        for search_path in &self.search_paths {
            let full_path = search_path.join(name);
            if full_path.is_file() {
                debug!("Resolved {} in {:?}", name, search_path);
                return Some(full_path);
            }
        }

        debug!("Failed to resolve include: {}", name);
        None
    }

    /// Load the lines of the include target named at `location`
    pub fn load(&self, name: &str, location: &Location) -> Result<Vec<Line>> {
        let path = self
            .resolve(name, Path::new(&location.file))
            .ok_or_else(|| Error::IncludeNotFound {
                location: location.clone(),
                name: name.to_string(),
            })?;
        read_source(&path)
    }
}
