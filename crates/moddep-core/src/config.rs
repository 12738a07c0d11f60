//! Configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Modules that are always satisfied by the compiler
pub const DEFAULT_SKIP_MODULES: &[&str] = &["iso_c_binding", "iso_fortran_env"];

/// moddep configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which files take part in the run
    pub discovery: DiscoveryConfig,

    /// Preprocessor configuration
    pub preprocess: PreprocessConfig,

    /// Resolution configuration
    pub resolve: ResolveConfig,

    /// Output configuration
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Whether sources come from walking root directories
    pub fn is_auto_discovery(&self) -> bool {
        self.discovery.files.is_empty() && self.discovery.manifests.is_empty()
    }
}

/// File discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directories walked in auto-discovery mode
    pub roots: Vec<PathBuf>,

    /// Explicit source files (disables the directory walk)
    pub files: Vec<PathBuf>,

    /// Manifest files listing sources relative to their own directory
    pub manifests: Vec<PathBuf>,

    /// File extensions to pick up, without the dot
    pub extensions: Vec<String>,

    /// Glob patterns for paths to leave out of the walk
    pub ignore: Vec<String>,

    /// Generated files added regardless of discovery
    pub always_include: Vec<PathBuf>,

    /// Files compiled but never checked for uses
    pub exclude: Vec<PathBuf>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            files: vec![],
            manifests: vec![],
            extensions: vec!["f90".into(), "F90".into()],
            ignore: vec![],
            always_include: vec![],
            exclude: vec![],
        }
    }
}

/// Preprocessor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Run the preprocessor before scanning
    pub enabled: bool,

    /// Macro seeds, `NAME` or `NAME=VALUE`
    pub macros: Vec<String>,

    /// Directories searched for `#include` targets
    pub search_paths: Vec<PathBuf>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            macros: vec![],
            search_paths: vec![],
        }
    }
}

/// How errors are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorMode {
    /// Collect every file's errors before reporting
    #[default]
    Accumulate,
    /// Stop at the first error
    FailFast,
}

/// Resolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Module names satisfied outside the project
    pub skip_modules: Vec<String>,

    /// Error reporting mode
    pub mode: ErrorMode,

    /// Worker threads for scanning (0 = one per core)
    pub parallelism: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            skip_modules: DEFAULT_SKIP_MODULES.iter().map(|m| m.to_string()).collect(),
            mode: ErrorMode::Accumulate,
            parallelism: 0,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Dependency listing path
    pub listing: PathBuf,

    /// Object manifest path (auto-discovery mode only)
    pub manifest: PathBuf,

    /// Directory prepended to every object name
    pub object_prefix: String,

    /// Object file extension, without the dot
    pub object_extension: String,

    /// Replace existing output files
    pub overwrite: bool,

    /// Also write link rules for programs
    pub link_rules: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            listing: PathBuf::from("depends.mak"),
            manifest: PathBuf::from("objects.mak"),
            object_prefix: String::new(),
            object_extension: "o".into(),
            overwrite: false,
            link_rules: false,
        }
    }
}
