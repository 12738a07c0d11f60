//! Project driver
//!
//! Runs the whole pipeline: discovery, parallel preprocess+scan, the symbol index
//! barrier, resolution, cycle detection and output.

use crate::discovery::discover;
use crate::graph::DependencyGraph;
use crate::listing::{render_manifest, Listing, StagedWrite};
use crate::objects::{ObjectMap, ObjectNamer};
use crate::resolver::{resolve, SkipSet};
use crate::SymbolIndex;
use moddep_core::config::{Config, ErrorMode};
use moddep_core::{Error, Failures, ScannedFile, SourceFile, UnitKind};
use moddep_parser::{MacroTable, ParallelScanner};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything a successful run produced
#[derive(Debug)]
pub struct Outcome {
    /// Discovered sources, in discovery order
    pub sources: Vec<SourceFile>,
    /// Scanned files, in discovery order; excluded files that failed are absent
    pub files: Vec<ScannedFile>,
    pub index: SymbolIndex,
    pub objects: ObjectMap,
    pub graph: DependencyGraph,
    pub listing: Listing,
}

impl Outcome {
    /// Object identities of every source, in discovery order
    pub fn manifest(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter_map(|s| self.objects.get(&s.path).map(str::to_string))
            .collect()
    }

    /// Files in a valid compile order
    pub fn compile_order(&self) -> moddep_core::Result<Vec<PathBuf>> {
        self.graph.compile_order()
    }

    /// Compile order with what is known about each file
    pub fn order_entries(&self) -> moddep_core::Result<Vec<OrderEntry>> {
        let order = self.compile_order()?;
        Ok(order
            .into_iter()
            .map(|file| {
                let scanned = self.files.iter().find(|f| f.source.path == file);
                OrderEntry {
                    object: self.objects.get(&file).map(str::to_string),
                    kind: scanned.map(|f| f.declaration.kind),
                    name: scanned.map(|f| f.declaration.name.clone()),
                    excluded: scanned.is_some_and(|f| f.source.excluded),
                    prerequisites: self
                        .graph
                        .prerequisites(&file)
                        .iter()
                        .map(|p| p.to_path_buf())
                        .collect(),
                    file,
                }
            })
            .collect())
    }
}

/// One file in compile order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEntry {
    pub file: PathBuf,
    pub object: Option<String>,
    pub kind: Option<UnitKind>,
    pub name: Option<String>,
    pub excluded: bool,
    pub prerequisites: Vec<PathBuf>,
}

/// Collects errors according to the error mode
struct Reporter {
    mode: ErrorMode,
    failures: Failures,
}

impl Reporter {
    fn new(mode: ErrorMode) -> Self {
        Self {
            mode,
            failures: Failures::new(),
        }
    }

    /// Record failures; in fail-fast mode the first one ends the run
    fn record(&mut self, failures: Failures) -> Result<(), Failures> {
        match self.mode {
            ErrorMode::Accumulate => {
                self.failures.extend(failures.into_errors());
                Ok(())
            }
            ErrorMode::FailFast => {
                let mut errors = failures.into_errors();
                errors.truncate(1);
                Err(Failures::from(errors))
            }
        }
    }

    /// End a stage; anything collected so far stops the run
    fn checkpoint(&mut self) -> Result<(), Failures> {
        std::mem::take(&mut self.failures).into_result()
    }
}

/// A configured moddep run
pub struct Project {
    config: Config,
}

impl Project {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover, scan, index and resolve, without writing anything
    pub fn analyze(&self) -> Result<Outcome, Failures> {
        let config = &self.config;
        let mut reporter = Reporter::new(config.resolve.mode);

        let sources = discover(&config.discovery)?;
        let files = self.scanner()?.scan_files(&sources, config.resolve.mode)?;

        // barrier: the index only exists once every file is scanned
        let mut index = SymbolIndex::new();
        for file in &files {
            if let Err(e) = index.insert(&file.declaration) {
                reporter.record(e.into())?;
            }
        }
        let stats = index.stats();
        info!(
            "Indexed {} module(s) and {} program(s)",
            stats.total_modules, stats.total_programs
        );

        let namer = ObjectNamer::from_config(&config.output);
        let paths: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();
        let objects = match namer.assign(&paths) {
            Ok(objects) => objects,
            Err(failures) => {
                reporter.record(failures)?;
                ObjectMap::default()
            }
        };
        reporter.checkpoint()?;

        let skip = SkipSet::with_defaults(&config.resolve.skip_modules);
        let mut graph = DependencyGraph::new();
        for file in &files {
            if file.source.excluded {
                graph.add_file(&file.source.path, &[]);
                continue;
            }
            match resolve(file, &index, &skip) {
                Ok(prerequisites) => graph.add_file(&file.source.path, &prerequisites),
                Err(failures) => reporter.record(failures)?,
            }
        }
        reporter.checkpoint()?;
        graph.check_acyclic()?;

        let listing = self.build_listing(&files, &namer, &objects, &graph);
        Ok(Outcome {
            sources,
            files,
            index,
            objects,
            graph,
            listing,
        })
    }

    /// Analyze, then write the listing (and the manifest in auto-discovery mode).
    ///
    /// Every output is staged before any is renamed into place, so a refused or failed
    /// write leaves all destinations untouched.
    pub fn run(&self) -> Result<Outcome, Failures> {
        let outcome = self.analyze()?;
        let output = &self.config.output;

        let listing = outcome.listing.stage(&output.listing, output.overwrite)?;
        let manifest = if self.config.is_auto_discovery() {
            let objects = outcome.manifest();
            let staged = StagedWrite::new(&output.manifest, &render_manifest(&objects), output.overwrite)?;
            Some((staged, objects.len()))
        } else {
            None
        };

        listing.commit()?;
        info!(
            "Wrote {} dependency edge(s) to {}",
            outcome.listing.edges().len(),
            output.listing.display()
        );
        if let Some((staged, count)) = manifest {
            staged.commit()?;
            info!("Wrote {} object(s) to {}", count, output.manifest.display());
        }
        Ok(outcome)
    }

    fn scanner(&self) -> Result<ParallelScanner, Error> {
        let preprocess = &self.config.preprocess;
        let scanner = if preprocess.enabled {
            let seed = MacroTable::from_seeds(&preprocess.macros)?;
            debug!("Seeded {} macro(s)", seed.len());
            ParallelScanner::new(seed, preprocess.search_paths.clone())
        } else {
            ParallelScanner::without_preprocessing()
        };
        Ok(scanner
            .with_parallelism(self.config.resolve.parallelism)
            .with_progress(|event| debug!("{:?}: {}", event.phase, event.message)))
    }

    fn build_listing(
        &self,
        files: &[ScannedFile],
        namer: &ObjectNamer,
        objects: &ObjectMap,
        graph: &DependencyGraph,
    ) -> Listing {
        let mut listing = Listing::new();
        let object = |path: &Path| objects.get(path).unwrap_or_default().to_string();

        for file in files.iter().filter(|f| !f.source.excluded) {
            let prerequisites = graph.prerequisites(&file.source.path);
            listing.push_target(
                &object(file.source.path.as_path()),
                prerequisites.into_iter().map(|p| object(p)),
            );
        }

        if self.config.output.link_rules {
            for file in files
                .iter()
                .filter(|f| !f.source.excluded && f.declaration.kind == UnitKind::Program)
            {
                let mut needed: Vec<String> = graph
                    .transitive_prerequisites(&file.source.path)
                    .iter()
                    .map(|p| object(p.as_path()))
                    .collect();
                needed.push(object(file.source.path.as_path()));
                needed.sort();
                listing.push_link_rule(&namer.program_target(&file.source.path), needed);
            }
        }
        listing
    }
}
