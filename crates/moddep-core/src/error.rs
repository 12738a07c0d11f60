//! Error types for moddep

use crate::location::Location;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// moddep error type
///
/// Every message starts with the `[Kind]` tag so that accumulated reports can be
/// grepped by category.
#[derive(Error, Debug)]
pub enum Error {
    #[error("[Io] {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("[IncludeNotFound] {location}: cannot find include file '{name}'")]
    IncludeNotFound { location: Location, name: String },

    #[error("[MalformedDirective] {location}: {message}")]
    MalformedDirective { location: Location, message: String },

    #[error("[NoDeclarationFound] {}: no module or program statement", .file.display())]
    NoDeclarationFound { file: PathBuf },

    #[error(
        "[MultipleDeclarationsFound] {}: found {} declarations ({})",
        .file.display(),
        .names.len(),
        .names.join(", ")
    )]
    MultipleDeclarationsFound { file: PathBuf, names: Vec<String> },

    #[error(
        "[DuplicateDefinition] module '{name}' is defined in both {} and {}",
        .first.display(),
        .second.display()
    )]
    DuplicateDefinition {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("[UnresolvedModule] {}: module '{module}' is not defined in any file", .file.display())]
    UnresolvedModule { module: String, file: PathBuf },

    #[error("[DependencyCycle] {}", render_cycle(.cycle))]
    DependencyCycle { cycle: Vec<PathBuf> },

    #[error(
        "[DuplicateObject] {} and {} both compile to '{object}'",
        .first.display(),
        .second.display()
    )]
    DuplicateObject {
        object: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("[OutputExists] {} already exists (pass --overwrite to replace it)", .0.display())]
    OutputExists(PathBuf),

    #[error("[Config] {0}")]
    Config(String),
}

/// Error category, used for reporting and for tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    IncludeNotFound,
    MalformedDirective,
    NoDeclarationFound,
    MultipleDeclarationsFound,
    DuplicateDefinition,
    UnresolvedModule,
    DependencyCycle,
    DuplicateObject,
    OutputExists,
    Config,
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a directive error at a location
    pub fn malformed(location: &Location, message: impl Into<String>) -> Self {
        Error::MalformedDirective {
            location: location.clone(),
            message: message.into(),
        }
    }

    /// Get the error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Io,
            Error::IncludeNotFound { .. } => ErrorKind::IncludeNotFound,
            Error::MalformedDirective { .. } => ErrorKind::MalformedDirective,
            Error::NoDeclarationFound { .. } => ErrorKind::NoDeclarationFound,
            Error::MultipleDeclarationsFound { .. } => ErrorKind::MultipleDeclarationsFound,
            Error::DuplicateDefinition { .. } => ErrorKind::DuplicateDefinition,
            Error::UnresolvedModule { .. } => ErrorKind::UnresolvedModule,
            Error::DependencyCycle { .. } => ErrorKind::DependencyCycle,
            Error::DuplicateObject { .. } => ErrorKind::DuplicateObject,
            Error::OutputExists(_) => ErrorKind::OutputExists,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the error can only be detected once every file has been scanned
    pub fn is_project_global(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DuplicateDefinition
                | ErrorKind::UnresolvedModule
                | ErrorKind::DependencyCycle
                | ErrorKind::DuplicateObject
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn render_cycle(cycle: &[PathBuf]) -> String {
    let files: Vec<String> = cycle.iter().map(|p| p.display().to_string()).collect();
    format!("circular module dependency: {}", files.join(" -> "))
}

/// Result type alias for moddep
pub type Result<T> = std::result::Result<T, Error>;

/// Every error collected by an accumulate-mode run
#[derive(Debug, Default)]
pub struct Failures {
    errors: Vec<Error>,
}

impl Failures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = Error>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> std::result::Result<(), Failures> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Error> for Failures {
    fn from(error: Error) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl From<Vec<Error>> for Failures {
    fn from(errors: Vec<Error>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Failures {}
