//! Core type definitions

use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A source file taking part in the run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path, as given or as discovered
    pub path: PathBuf,
    /// Compiled, but its uses are never resolved
    pub excluded: bool,
    /// Added regardless of discovery filters (generated support files)
    pub always_include: bool,
}

impl SourceFile {
    /// Create a regular source file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            excluded: false,
            always_include: false,
        }
    }

    /// Mark the file as excluded from dependency checking
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Mark the file as always included
    pub fn always_included(mut self) -> Self {
        self.always_include = true;
        self
    }
}

/// One source line and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub location: Location,
}

impl Line {
    pub fn new(text: impl Into<String>, location: Location) -> Self {
        Self {
            text: text.into(),
            location,
        }
    }
}

/// Kind of program unit a file declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Module,
    Program,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Module => write!(f, "module"),
            UnitKind::Program => write!(f, "program"),
        }
    }
}

/// The single module or program a file defines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Defining file
    pub file: PathBuf,
    /// Module or program
    pub kind: UnitKind,
    /// Lower-cased unit name
    pub name: String,
}

/// A `use` of a module by a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseEdge {
    /// Using file
    pub file: PathBuf,
    /// Lower-cased module name
    pub module: String,
    /// Written as `use, intrinsic :: name`
    pub intrinsic: bool,
    /// Line of the first occurrence
    pub line: u32,
}

/// Everything learned from one preprocessed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub source: SourceFile,
    pub declaration: Declaration,
    /// Used modules, first-appearance order, no duplicates
    pub uses: Vec<UseEdge>,
}

/// Output edge: `target : prerequisite`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Object of the using file
    pub target: String,
    /// Object of the defining file
    pub prerequisite: String,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.target, self.prerequisite)
    }
}
