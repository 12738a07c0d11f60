//! Conditional-compilation preprocessor
//!
//! Resolves `#include`, `#define`/`#undef` and `#ifdef`/`#ifndef`/`#else`/`#endif`
//! before a file is scanned for declarations. Every level (the whole file, then each
//! chosen branch) is handled in the same fixed order:
//!
//! 1. `#include` lines not nested in a conditional are replaced by the included lines
//! 2. `#define`/`#undef` lines not nested in a conditional are applied and dropped
//! 3. conditionals are resolved and their chosen branch goes through 1–3 again
//!
//! Surviving content lines get macro substitution with the table as it stands when
//! they are emitted.

pub mod conditional;
pub mod directive;
pub mod include;
pub mod macros;

pub use conditional::{Block, Item};
pub use directive::Directive;
pub use include::IncludeResolver;
pub use macros::{MacroDefinition, MacroTable};

use std::path::{Path, PathBuf};
use tracing::debug;

use moddep_core::{Error, Line, Result};

use crate::read_source;
use crate::scanner::DeclarationScanner;

/// Preprocessor for one run; cheap to share between worker threads
pub struct Preprocessor {
    resolver: IncludeResolver,
    scanner: DeclarationScanner,
}

impl Preprocessor {
    /// Create a preprocessor with the given include search paths
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            resolver: IncludeResolver::new(search_paths),
            scanner: DeclarationScanner::new(),
        }
    }

    /// Get the include resolver
    pub fn resolver(&self) -> &IncludeResolver {
        &self.resolver
    }

    /// Preprocess lines against `macros`.
    ///
    /// The table is updated in place by every `#define`/`#undef` that takes effect;
    /// callers pass a fresh copy per file.
    pub fn preprocess(&self, lines: Vec<Line>, macros: &mut MacroTable) -> Result<Vec<Line>> {
        let items = lines
            .into_iter()
            .map(Item::classify)
            .collect::<Result<Vec<_>>>()?;
        let items = self.prepare_level(items, macros)?;
        conditional::evaluate(
            items,
            macros,
            |branch, macros| self.prepare_level(branch, macros),
            |line, macros| self.emit(line, macros),
        )
    }

    /// Read and preprocess a file
    pub fn preprocess_file(&self, path: &Path, macros: &mut MacroTable) -> Result<Vec<Line>> {
        let lines = read_source(path)?;
        self.preprocess(lines, macros)
    }

    fn prepare_level(&self, items: Vec<Item>, macros: &mut MacroTable) -> Result<Vec<Item>> {
        let items = self.splice_includes(items)?;
        Ok(apply_definitions(items, macros))
    }

    fn splice_includes(&self, items: Vec<Item>) -> Result<Vec<Item>> {
        let mut spliced = Vec::with_capacity(items.len());
        let mut depth = 0usize;

        for item in items {
            match &item.directive {
                Some(Directive::Include(name)) if depth == 0 => {
                    let lines = self.resolver.load(name, &item.line.location)?;
                    debug!("{}: including {} line(s) of {}", item.line.location, lines.len(), name);
                    for line in lines {
                        let included = Item::classify(line)?;
                        if let Some(Directive::Include(nested)) = &included.directive {
                            return Err(Error::malformed(
                                &included.line.location,
                                format!("nested #include of '{}' inside included file '{}'", nested, name),
                            ));
                        }
                        spliced.push(included);
                    }
                    continue;
                }
                Some(directive) if directive.opens_block() => depth += 1,
                Some(directive) if directive.closes_block() => depth = depth.saturating_sub(1),
                _ => {}
            }
            spliced.push(item);
        }

        Ok(spliced)
    }

    fn emit(&self, line: &Line, macros: &MacroTable) -> Line {
        let keep = self.scanner.unit_name_span(&line.text);
        Line::new(macros.expand(&line.text, keep), line.location.clone())
    }
}

/// Apply and drop the `#define`/`#undef` lines that are not nested in a conditional
fn apply_definitions(items: Vec<Item>, macros: &mut MacroTable) -> Vec<Item> {
    let mut remaining = Vec::with_capacity(items.len());
    let mut depth = 0usize;

    for item in items {
        match &item.directive {
            Some(Directive::Define { name, value }) if depth == 0 => {
                debug!("{}: #define {}", item.line.location, name);
                macros.define(MacroDefinition {
                    name: name.clone(),
                    value: value.clone(),
                });
                continue;
            }
            Some(Directive::Undef(name)) if depth == 0 => {
                debug!("{}: #undef {}", item.line.location, name);
                macros.undefine(name);
                continue;
            }
            Some(directive) if directive.opens_block() => depth += 1,
            Some(directive) if directive.closes_block() => depth = depth.saturating_sub(1),
            _ => {}
        }
        remaining.push(item);
    }

    remaining
}
