//! Source discovery
//!
//! Collects the files taking part in a run, either from explicit lists and manifests
//! or by walking root directories.

use globset::{Glob, GlobSet, GlobSetBuilder};
use moddep_core::config::DiscoveryConfig;
use moddep_core::{Error, Result, SourceFile};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Collect the run's source files.
///
/// Walked files come in directory order sorted by file name, so the result does not
/// depend on how the filesystem enumerates entries. Always-include files are appended
/// without filtering; files on the exclude list are marked excluded (and added if
/// discovery did not find them).
pub fn discover(config: &DiscoveryConfig) -> Result<Vec<SourceFile>> {
    let explicit = !config.files.is_empty() || !config.manifests.is_empty();
    let paths = if explicit {
        let mut paths: Vec<PathBuf> = config.files.clone();
        for manifest in &config.manifests {
            paths.extend(read_manifest(manifest)?);
        }
        paths
    } else {
        let ignore = build_globset(&config.ignore)?;
        let mut paths = Vec::new();
        for root in &config.roots {
            paths.extend(walk_root(root, &config.extensions, &ignore)?);
        }
        paths
    };

    let excluded: HashSet<PathBuf> = config.exclude.iter().map(|p| normalize(p)).collect();
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for path in paths.iter().map(|p| normalize(p)) {
        if seen.insert(path.clone()) {
            let mut file = SourceFile::new(path.clone());
            file.excluded = excluded.contains(&path);
            files.push(file);
        }
    }
    for path in config.always_include.iter().map(|p| normalize(p)) {
        if seen.insert(path.clone()) {
            let mut file = SourceFile::new(path.clone()).always_included();
            file.excluded = excluded.contains(&path);
            files.push(file);
        } else if let Some(file) = files.iter_mut().find(|f| f.path == path) {
            file.always_include = true;
        }
    }
    for path in config.exclude.iter().map(|p| normalize(p)) {
        if seen.insert(path.clone()) {
            files.push(SourceFile::new(path).excluded());
        }
    }

    info!(
        "Discovered {} source file(s) ({} excluded)",
        files.len(),
        files.iter().filter(|f| f.excluded).count()
    );
    Ok(files)
}

/// Read a manifest: one path per line, relative to the manifest's directory.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_manifest(manifest: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(manifest).map_err(|e| Error::io(manifest, e))?;
    let base = manifest.parent().unwrap_or(Path::new(""));
    let paths: Vec<PathBuf> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| base.join(line))
        .collect();
    debug!("Manifest {:?} lists {} file(s)", manifest, paths.len());
    Ok(paths)
}

fn walk_root(root: &Path, extensions: &[String], ignore: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let message = e.to_string();
            match e.into_io_error() {
                Some(source) => Error::io(&path, source),
                None => Error::Config(format!("cannot walk {}: {}", path.display(), message)),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e == ext));
        if !matches_extension {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = path.file_name().map(Path::new).unwrap_or(relative);
        if ignore.is_match(relative) || ignore.is_match(name) {
            debug!("Ignoring {:?}", path);
            continue;
        }
        paths.push(path.to_path_buf());
    }
    debug!("Found {} file(s) under {:?}", paths.len(), root);
    Ok(paths)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|e| Error::Config(format!("invalid ignore pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("invalid ignore patterns: {}", e)))
}

/// Drop `.` components so `./src/a.f90` and `src/a.f90` name the same file
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
