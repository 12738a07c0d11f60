//! Dependency Resolver
//!
//! Joins a file's use edges through the symbol index.

use crate::SymbolIndex;
use moddep_core::config::DEFAULT_SKIP_MODULES;
use moddep_core::{Error, Failures, ScannedFile};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::trace;

/// Module names satisfied outside the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipSet {
    names: BTreeSet<String>,
}

impl SkipSet {
    /// Create a skip set holding only `names`
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_lowercase()).collect(),
        }
    }

    /// Create a skip set holding `names` plus the compiler-provided modules
    pub fn with_defaults<S: AsRef<str>>(names: &[S]) -> Self {
        let mut set = Self::new(names);
        set.names
            .extend(DEFAULT_SKIP_MODULES.iter().map(|m| m.to_string()));
        set
    }

    pub fn contains(&self, module: &str) -> bool {
        self.names.contains(module)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for SkipSet {
    fn default() -> Self {
        Self::with_defaults::<&str>(&[])
    }
}

/// Resolve the files a scanned file depends on.
///
/// Skip-set and `use, intrinsic` edges are dropped; a file never depends on itself.
/// Prerequisites come back in first-use order without duplicates. Every module that
/// cannot be found is reported, not just the first.
pub fn resolve(
    file: &ScannedFile,
    index: &SymbolIndex,
    skip: &SkipSet,
) -> std::result::Result<Vec<PathBuf>, Failures> {
    let mut prerequisites: Vec<PathBuf> = Vec::new();
    let mut failures = Failures::new();

    for edge in &file.uses {
        if edge.intrinsic || skip.contains(&edge.module) {
            trace!("{:?}: skipping {}", edge.file, edge.module);
            continue;
        }
        match index.lookup(&edge.module) {
            Some(defining) if defining == file.source.path => {}
            Some(defining) => {
                if !prerequisites.iter().any(|p| p == defining) {
                    prerequisites.push(defining.to_path_buf());
                }
            }
            None => failures.push(Error::UnresolvedModule {
                module: edge.module.clone(),
                file: edge.file.clone(),
            }),
        }
    }

    failures.into_result().map(|_| prerequisites)
}
