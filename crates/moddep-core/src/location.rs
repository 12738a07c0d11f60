//! Source code location types

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A line in a source file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: String,
    /// Line (1-based)
    pub line: u32,
}

impl Location {
    /// Create a new location
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Create a location from a path
    pub fn in_path(path: &Path, line: u32) -> Self {
        Self::new(path.to_string_lossy(), line)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let loc = Location::in_path(Path::new("src/a.F90"), 12);
        assert_eq!(loc.to_string(), "src/a.F90:12");
    }
}
