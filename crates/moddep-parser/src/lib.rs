//! moddep Parser
//!
//! Turns source files into declarations and use edges.
//!
//! ## Modules
//!
//! - `preprocessor` - `#include`/`#define`/`#ifdef` resolution
//! - `scanner` - `module`/`program`/`use` statement recognition
//! - `parallel` - Parallel preprocess+scan of many files using rayon

pub mod parallel;
pub mod preprocessor;
pub mod scanner;

pub use parallel::{ParallelScanner, ProgressEvent, ProgressPhase};
pub use preprocessor::{MacroDefinition, MacroTable, Preprocessor};
pub use scanner::{DeclarationScan, DeclarationScanner};

use moddep_core::{Error, Line, Location, Result};
use std::path::Path;

/// Read a source file into lines.
///
/// Blank lines and full-line `!` comments are dropped; every kept line keeps its
/// original line number.
pub fn read_source(path: &Path) -> Result<Vec<Line>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(source_lines(path, &text))
}

/// Split source text into lines, as `read_source` does
pub fn source_lines(path: &Path, text: &str) -> Vec<Line> {
    let file = path.to_string_lossy();
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('!')
        })
        .map(|(index, line)| Line::new(line, Location::new(file.as_ref(), index as u32 + 1)))
        .collect()
}
