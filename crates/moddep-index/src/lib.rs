//! moddep Index
//!
//! Project-wide stages that run once every file has been scanned: the symbol index,
//! dependency resolution, object naming and listing output.

use moddep_core::{Declaration, Error, Result, UnitKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod discovery;
pub mod graph;
pub mod listing;
pub mod objects;
pub mod project;
pub mod resolver;

pub use discovery::discover;
pub use graph::DependencyGraph;
pub use listing::{Listing, StagedWrite, HEADER};
pub use objects::{ObjectMap, ObjectNamer};
pub use project::{OrderEntry, Outcome, Project};
pub use resolver::{resolve, SkipSet};

/// Where a unit is defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub file: PathBuf,
    pub kind: UnitKind,
}

/// Global unit name → defining file map.
///
/// Built once all declarations are known and never modified afterwards.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    units: HashMap<String, Definition>,
}

impl SymbolIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index, failing on the first name defined twice
    pub fn build<'a>(declarations: impl IntoIterator<Item = &'a Declaration>) -> Result<Self> {
        let mut index = Self::new();
        for declaration in declarations {
            index.insert(declaration)?;
        }
        Ok(index)
    }

    /// Add one declaration.
    ///
    /// A clash is reported against the file that defined the name first, and the
    /// first definition is kept.
    pub fn insert(&mut self, declaration: &Declaration) -> Result<()> {
        if let Some(existing) = self.units.get(&declaration.name) {
            return Err(Error::DuplicateDefinition {
                name: declaration.name.clone(),
                first: existing.file.clone(),
                second: declaration.file.clone(),
            });
        }
        debug!("Indexed {} {} from {:?}", declaration.kind, declaration.name, declaration.file);
        self.units.insert(
            declaration.name.clone(),
            Definition {
                file: declaration.file.clone(),
                kind: declaration.kind,
            },
        );
        Ok(())
    }

    /// File that defines `name`
    pub fn lookup(&self, name: &str) -> Option<&Path> {
        self.units.get(name).map(|d| d.file.as_path())
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.units.get(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get statistics
    pub fn stats(&self) -> IndexStats {
        let programs = self
            .units
            .values()
            .filter(|d| d.kind == UnitKind::Program)
            .count();
        IndexStats {
            total_modules: self.units.len() - programs,
            total_programs: programs,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub total_modules: usize,
    pub total_programs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use moddep_core::ErrorKind;

    fn declaration(file: &str, kind: UnitKind, name: &str) -> Declaration {
        Declaration {
            file: PathBuf::from(file),
            kind,
            name: name.into(),
        }
    }

    #[test]
    fn test_symbol_index() {
        let declarations = vec![
            declaration("src/a.f90", UnitKind::Module, "a"),
            declaration("src/b.f90", UnitKind::Module, "b"),
            declaration("src/main.f90", UnitKind::Program, "main"),
        ];
        let index = SymbolIndex::build(&declarations).unwrap();

        assert_eq!(index.lookup("b"), Some(Path::new("src/b.f90")));
        assert_eq!(index.lookup("c"), None);
        assert_eq!(
            index.stats(),
            IndexStats {
                total_modules: 2,
                total_programs: 1
            }
        );
    }

    #[test]
    fn test_duplicate_definition_names_both_files() {
        let declarations = vec![
            declaration("x1.f90", UnitKind::Module, "x"),
            declaration("x2.f90", UnitKind::Module, "x"),
        ];
        let err = SymbolIndex::build(&declarations).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateDefinition);
        match err {
            Error::DuplicateDefinition { name, first, second } => {
                assert_eq!(name, "x");
                assert_eq!(first, PathBuf::from("x1.f90"));
                assert_eq!(second, PathBuf::from("x2.f90"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_program_and_module_share_namespace() {
        let mut index = SymbolIndex::new();
        index
            .insert(&declaration("solver.f90", UnitKind::Module, "solver"))
            .unwrap();
        assert!(index
            .insert(&declaration("run.f90", UnitKind::Program, "solver"))
            .is_err());
        assert_eq!(index.len(), 1);
    }
}
