//! Listing Writer
//!
//! Renders the dependency listing and object manifest, and writes them atomically.

use moddep_core::{DependencyEdge, Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Leading comment of every generated file
pub const HEADER: &str = "#\n# This file is generated automatically. DO NOT EDIT!\n#\n";

/// Dependency listing, grouped by target in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    edges: Vec<DependencyEdge>,
    link_rules: Vec<DependencyEdge>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the edges of one target; they are sorted by prerequisite and de-duplicated
    pub fn push_target(&mut self, target: &str, prerequisites: impl IntoIterator<Item = String>) {
        let mut prerequisites: Vec<String> = prerequisites.into_iter().collect();
        prerequisites.sort();
        prerequisites.dedup();
        self.edges.extend(prerequisites.into_iter().map(|prerequisite| DependencyEdge {
            target: target.to_string(),
            prerequisite,
        }));
    }

    /// Add the link rule of one program
    pub fn push_link_rule(&mut self, program: &str, objects: impl IntoIterator<Item = String>) {
        self.link_rules.extend(objects.into_iter().map(|object| DependencyEdge {
            target: program.to_string(),
            prerequisite: object,
        }));
    }

    /// Object dependency edges
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn link_rules(&self) -> &[DependencyEdge] {
        &self.link_rules
    }

    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        for edge in &self.edges {
            out.push_str(&edge.to_string());
            out.push('\n');
        }
        if !self.link_rules.is_empty() {
            out.push_str("\n# link rules\n");
            for rule in &self.link_rules {
                out.push_str(&rule.to_string());
                out.push('\n');
            }
        }
        out
    }

    /// Write the listing to `path`
    pub fn write(&self, path: &Path, overwrite: bool) -> Result<()> {
        self.stage(path, overwrite)?.commit()?;
        info!("Wrote {} dependency edge(s) to {}", self.edges.len(), path.display());
        Ok(())
    }

    /// Render the listing into a temporary file next to `path`
    pub fn stage(&self, path: &Path, overwrite: bool) -> Result<StagedWrite> {
        StagedWrite::new(path, &self.render(), overwrite)
    }
}

/// Render the object manifest: one object identity per line
pub fn render_manifest<S: AsRef<str>>(objects: &[S]) -> String {
    let mut out = String::from(HEADER);
    for object in objects {
        out.push_str(object.as_ref());
        out.push('\n');
    }
    out
}

/// Replace `path` with `contents` in one step.
///
/// The text goes to a temporary file next to `path` that is renamed over it, so a
/// reader sees either the old file or the complete new one. An existing file is only
/// replaced when `overwrite` is set.
pub fn write_atomic(path: &Path, contents: &str, overwrite: bool) -> Result<()> {
    StagedWrite::new(path, contents, overwrite)?.commit()
}

/// Output written to a temporary file but not yet renamed into place.
///
/// Dropping it without `commit` removes the temporary file and leaves `path` alone,
/// so several outputs can be staged and only committed once all of them are ready.
#[derive(Debug)]
pub struct StagedWrite {
    path: PathBuf,
    file: NamedTempFile,
}

impl StagedWrite {
    /// Check the overwrite guard and write `contents` next to `path`
    pub fn new(path: &Path, contents: &str, overwrite: bool) -> Result<Self> {
        if !overwrite && path.exists() {
            return Err(Error::OutputExists(path.to_path_buf()));
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::io(file.path(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temporary file over the destination
    pub fn commit(self) -> Result<()> {
        let path = self.path;
        self.file.persist(&path).map_err(|e| Error::io(&path, e.error))?;
        Ok(())
    }
}
