//! Declaration & Use Scanner
//!
//! Finds the module or program a preprocessed file declares and the modules it uses.

use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

use moddep_core::{Declaration, Error, Line, Result, SourceFile, UnitKind, UseEdge};

/// Outcome of looking for the file's declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationScan {
    Module(String),
    Program(String),
    None,
    Multiple(Vec<String>),
}

impl DeclarationScan {
    /// Turn the outcome into the file's declaration, or the matching error
    pub fn into_declaration(self, file: &Path) -> Result<Declaration> {
        let (kind, name) = match self {
            DeclarationScan::Module(name) => (UnitKind::Module, name),
            DeclarationScan::Program(name) => (UnitKind::Program, name),
            DeclarationScan::None => {
                return Err(Error::NoDeclarationFound {
                    file: file.to_path_buf(),
                })
            }
            DeclarationScan::Multiple(names) => {
                return Err(Error::MultipleDeclarationsFound {
                    file: file.to_path_buf(),
                    names,
                })
            }
        };
        Ok(Declaration {
            file: file.to_path_buf(),
            kind,
            name,
        })
    }
}

/// Regex-based scanner for `module`, `program` and `use` statements
pub struct DeclarationScanner {
    unit: Regex,
    uses: Regex,
}

impl DeclarationScanner {
    /// Create a new scanner
    pub fn new() -> Self {
        Self {
            // `module name` / `program name` alone on the line; this leaves out
            // `module procedure`, `module subroutine f(x)` and `end module name`
            unit: Regex::new(r"(?i)^\s*(module|program)\s+([a-z_]\w*)\s*(?:!.*)?$").unwrap(),
            uses: Regex::new(
                r"(?i)^\s*use(?:\s*,\s*(intrinsic|non_intrinsic))?(?:\s*::\s*|\s+)([a-z_]\w*)",
            )
            .unwrap(),
        }
    }

    /// Scan a preprocessed file
    pub fn scan(&self, source: &SourceFile, lines: &[Line]) -> Result<(Declaration, Vec<UseEdge>)> {
        let declaration = self.find_declaration(lines).into_declaration(&source.path)?;
        let uses = self.find_uses(&source.path, lines);
        debug!(
            "{:?}: {} {} uses {} module(s)",
            source.path,
            declaration.kind,
            declaration.name,
            uses.len()
        );
        Ok((declaration, uses))
    }

    /// Find the declared unit
    pub fn find_declaration(&self, lines: &[Line]) -> DeclarationScan {
        let mut found: Vec<(UnitKind, String)> = Vec::new();
        for line in lines {
            let Some(caps) = self.unit.captures(&line.text) else {
                continue;
            };
            let name = caps[2].to_lowercase();
            if name == "procedure" {
                continue;
            }
            let kind = if caps[1].eq_ignore_ascii_case("module") {
                UnitKind::Module
            } else {
                UnitKind::Program
            };
            found.push((kind, name));
        }

        match found.len() {
            0 => DeclarationScan::None,
            1 => {
                let (kind, name) = found.remove(0);
                match kind {
                    UnitKind::Module => DeclarationScan::Module(name),
                    UnitKind::Program => DeclarationScan::Program(name),
                }
            }
            _ => DeclarationScan::Multiple(found.into_iter().map(|(_, name)| name).collect()),
        }
    }

    /// Find used modules, in first-appearance order without duplicates
    pub fn find_uses(&self, file: &Path, lines: &[Line]) -> Vec<UseEdge> {
        let mut seen = HashSet::new();
        let mut uses = Vec::new();
        for line in lines {
            let Some(caps) = self.uses.captures(&line.text) else {
                continue;
            };
            let module = caps[2].to_lowercase();
            if !seen.insert(module.clone()) {
                continue;
            }
            let intrinsic = caps
                .get(1)
                .is_some_and(|nature| nature.as_str().eq_ignore_ascii_case("intrinsic"));
            uses.push(UseEdge {
                file: file.to_path_buf(),
                module,
                intrinsic,
                line: line.location.line,
            });
        }
        uses
    }

    /// Byte range of the unit name in a `module`, `program` or `use` statement
    pub fn unit_name_span(&self, text: &str) -> Option<Range<usize>> {
        self.uses
            .captures(text)
            .or_else(|| self.unit.captures(text))
            .and_then(|caps| caps.get(2))
            .map(|name| name.range())
    }
}

impl Default for DeclarationScanner {
    fn default() -> Self {
        Self::new()
    }
}
