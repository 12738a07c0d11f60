//! Parallel file scanning using rayon
//!
//! Every file is preprocessed against its own copy of the seed macros and scanned
//! independently, so files can be handled in any order on any thread. Results come
//! back in input order.

use crate::preprocessor::{MacroTable, Preprocessor};
use crate::read_source;
use crate::scanner::DeclarationScanner;
use moddep_core::config::ErrorMode;
use moddep_core::{Error, Failures, Result, ScannedFile, SourceFile};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress event for tracking scanning progress
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Scanning phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Scanning,
    Complete,
}

/// Parallel preprocess+scan driver
pub struct ParallelScanner {
    preprocessor: Option<Preprocessor>,
    scanner: DeclarationScanner,
    seed: MacroTable,
    parallelism: usize,
    progress_callback: Option<Arc<ProgressCallback>>,
}

impl ParallelScanner {
    /// Create a scanner that preprocesses every file against `seed`
    pub fn new(seed: MacroTable, search_paths: Vec<PathBuf>) -> Self {
        Self {
            preprocessor: Some(Preprocessor::new(search_paths)),
            scanner: DeclarationScanner::new(),
            seed,
            parallelism: 0,
            progress_callback: None,
        }
    }

    /// Create a scanner that reads files verbatim
    pub fn without_preprocessing() -> Self {
        Self {
            preprocessor: None,
            scanner: DeclarationScanner::new(),
            seed: MacroTable::new(),
            parallelism: 0,
            progress_callback: None,
        }
    }

    /// Number of worker threads; 0 uses rayon's global pool
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Preprocess and scan a single file
    pub fn scan_file(&self, source: &SourceFile) -> Result<ScannedFile> {
        let lines = match &self.preprocessor {
            Some(preprocessor) => {
                let mut macros = self.seed.clone();
                preprocessor.preprocess_file(&source.path, &mut macros)?
            }
            None => read_source(&source.path)?,
        };

        if source.excluded {
            // excluded files only contribute their declaration
            let declaration = self
                .scanner
                .find_declaration(&lines)
                .into_declaration(&source.path)?;
            return Ok(ScannedFile {
                source: source.clone(),
                declaration,
                uses: Vec::new(),
            });
        }

        let (declaration, uses) = self.scanner.scan(source, &lines)?;
        Ok(ScannedFile {
            source: source.clone(),
            declaration,
            uses,
        })
    }

    /// Scan many files in parallel.
    ///
    /// Excluded files are best effort: a failure is logged and the file is dropped.
    /// In accumulate mode every other failure is collected; in fail-fast mode the
    /// first one stops the run.
    pub fn scan_files(
        &self,
        sources: &[SourceFile],
        mode: ErrorMode,
    ) -> std::result::Result<Vec<ScannedFile>, Failures> {
        let total = sources.len();
        let processed = AtomicUsize::new(0);

        self.emit_progress(ProgressPhase::Scanning, 0, total, "Starting parallel scan...");

        let scan_one = |source: &SourceFile| -> Result<Option<ScannedFile>> {
            let result = match self.scan_file(source) {
                Ok(scanned) => Ok(Some(scanned)),
                Err(e) if source.excluded => {
                    warn!("Ignoring excluded file {:?}: {}", source.path, e);
                    Ok(None)
                }
                Err(e) => Err(e),
            };

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            if current % 10 == 0 || current == total {
                self.emit_progress(
                    ProgressPhase::Scanning,
                    current,
                    total,
                    format!("Scanned {}/{} files", current, total),
                );
            }
            result
        };

        let scanned = self.install(|| match mode {
            ErrorMode::FailFast => sources
                .par_iter()
                .map(scan_one)
                .collect::<Result<Vec<_>>>()
                .map(|files| files.into_iter().flatten().collect::<Vec<_>>())
                .map_err(Failures::from),
            ErrorMode::Accumulate => {
                let results: Vec<_> = sources.par_iter().map(scan_one).collect();
                let mut files = Vec::with_capacity(results.len());
                let mut failures = Failures::new();
                for result in results {
                    match result {
                        Ok(Some(file)) => files.push(file),
                        Ok(None) => {}
                        Err(e) => failures.push(e),
                    }
                }
                failures.into_result().map(|_| files)
            }
        })?;

        info!("Scanned {} of {} files", scanned.len(), total);
        self.emit_progress(ProgressPhase::Complete, total, total, "Scanning complete");
        Ok(scanned)
    }

    fn install<T, F>(&self, work: F) -> std::result::Result<T, Failures>
    where
        T: Send,
        F: FnOnce() -> std::result::Result<T, Failures> + Send,
    {
        if self.parallelism == 0 {
            return work();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
            .map_err(|e| Error::Config(format!("cannot start {} worker threads: {}", self.parallelism, e)))?;
        pool.install(work)
    }

    fn emit_progress<S: Into<String>>(&self, phase: ProgressPhase, current: usize, total: usize, message: S) {
        if let Some(ref callback) = self.progress_callback {
            callback(ProgressEvent {
                phase,
                current,
                total,
                message: message.into(),
            });
        }
    }
}
