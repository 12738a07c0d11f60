//! Object naming
//!
//! Maps source files to the object files the build produces for them.

use moddep_core::config::OutputConfig;
use moddep_core::{Error, Failures};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Builds object identities as `<prefix>/<stem>.<extension>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNamer {
    prefix: String,
    extension: String,
}

impl ObjectNamer {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.object_prefix.clone(), config.object_extension.clone())
    }

    /// Object identity of a source file
    pub fn object_id(&self, source: &Path) -> String {
        if self.extension.is_empty() {
            self.prefixed(&self.stem(source))
        } else {
            self.prefixed(&format!("{}.{}", self.stem(source), self.extension))
        }
    }

    /// Link target of a program file (the object name without extension)
    pub fn program_target(&self, source: &Path) -> String {
        self.prefixed(&self.stem(source))
    }

    /// Name every file, failing when two files would produce the same object
    pub fn assign(&self, sources: &[PathBuf]) -> std::result::Result<ObjectMap, Failures> {
        let mut by_object: HashMap<String, PathBuf> = HashMap::new();
        let mut map = ObjectMap::default();
        let mut failures = Failures::new();

        for source in sources {
            let object = self.object_id(source);
            if let Some(first) = by_object.get(&object) {
                failures.push(Error::DuplicateObject {
                    object,
                    first: first.clone(),
                    second: source.clone(),
                });
                continue;
            }
            by_object.insert(object.clone(), source.clone());
            map.objects.insert(source.clone(), object);
        }

        failures.into_result().map(|_| map)
    }

    fn stem(&self, source: &Path) -> String {
        source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn prefixed(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

impl Default for ObjectNamer {
    fn default() -> Self {
        Self::new("", "o")
    }
}

/// Source file → object identity, with no two files sharing an object
#[derive(Debug, Clone, Default)]
pub struct ObjectMap {
    objects: HashMap<PathBuf, String>,
}

impl ObjectMap {
    pub fn get(&self, source: &Path) -> Option<&str> {
        self.objects.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
