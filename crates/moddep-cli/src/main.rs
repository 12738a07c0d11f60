//! moddep CLI
//!
//! Command-line interface for dependency listing generation.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use moddep_core::config::{Config, ErrorMode};
use moddep_index::listing::write_atomic;
use moddep_index::Project;
use moddep_parser::{MacroTable, Preprocessor};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "moddep")]
#[command(author, version, about = "Compile-order dependency generator for module-based sources", long_about = None)]
struct Cli {
    /// YAML configuration file; flags override its values
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the dependency listing (and object manifest in auto-discovery mode)
    Deps {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the files in compile order
    Order {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Preprocess a single file
    Preprocess {
        /// Source file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Define a macro, `NAME` or `NAME=VALUE`
        #[arg(short = 'D', long = "define", value_name = "MACRO")]
        macros: Vec<String>,

        /// Add an include search path
        #[arg(short = 'I', long = "include", value_name = "DIR")]
        search_paths: Vec<PathBuf>,

        /// Replace an existing output file
        #[arg(long)]
        overwrite: bool,
    },
}

/// Options shared by every whole-project command
#[derive(Args)]
struct ProjectArgs {
    /// Directories to search for sources
    #[arg(short, long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Explicit source files (disables the directory walk)
    #[arg(short, long = "file", value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Manifest files listing sources relative to their own directory
    #[arg(long = "manifest-in", value_name = "FILE")]
    manifests: Vec<PathBuf>,

    /// File extensions to pick up, without the dot
    #[arg(short, long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Glob pattern of paths to leave out of the walk
    #[arg(long, value_name = "GLOB")]
    ignore: Vec<String>,

    /// Generated file to add regardless of discovery
    #[arg(long = "always-include", value_name = "FILE")]
    always_include: Vec<PathBuf>,

    /// File compiled but never checked for uses
    #[arg(long, value_name = "FILE")]
    exclude: Vec<PathBuf>,

    /// Module satisfied outside the project
    #[arg(short, long = "skip", value_name = "MODULE")]
    skip_modules: Vec<String>,

    /// Define a macro, `NAME` or `NAME=VALUE`
    #[arg(short = 'D', long = "define", value_name = "MACRO")]
    macros: Vec<String>,

    /// Add an include search path
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Read sources without preprocessing them
    #[arg(long)]
    no_preprocess: bool,

    /// Stop at the first error
    #[arg(long)]
    fail_fast: bool,

    /// Worker threads (0 = one per core)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
}

#[derive(Args)]
struct OutputArgs {
    /// Dependency listing path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Object manifest path
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Directory prepended to every object name
    #[arg(short = 'p', long, value_name = "DIR")]
    object_prefix: Option<String>,

    /// Object file extension
    #[arg(long = "object-ext", value_name = "EXT")]
    object_extension: Option<String>,

    /// Replace existing output files
    #[arg(long)]
    overwrite: bool,

    /// Also write link rules for programs
    #[arg(long)]
    link_rules: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl ProjectArgs {
    fn apply(self, config: &mut Config) {
        let discovery = &mut config.discovery;
        if !self.roots.is_empty() {
            discovery.roots = self.roots;
        }
        if !self.files.is_empty() {
            discovery.files = self.files;
        }
        discovery.manifests.extend(self.manifests);
        if !self.extensions.is_empty() {
            discovery.extensions = self
                .extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect();
        }
        discovery.ignore.extend(self.ignore);
        discovery.always_include.extend(self.always_include);
        discovery.exclude.extend(self.exclude);

        config.resolve.skip_modules.extend(self.skip_modules);
        if self.fail_fast {
            config.resolve.mode = ErrorMode::FailFast;
        }
        if let Some(jobs) = self.jobs {
            config.resolve.parallelism = jobs;
        }

        config.preprocess.macros.extend(self.macros);
        config.preprocess.search_paths.extend(self.search_paths);
        if self.no_preprocess {
            config.preprocess.enabled = false;
        }
    }
}

impl OutputArgs {
    fn apply(self, config: &mut Config) {
        let output = &mut config.output;
        if let Some(listing) = self.output {
            output.listing = listing;
        }
        if let Some(manifest) = self.manifest {
            output.manifest = manifest;
        }
        if let Some(prefix) = self.object_prefix {
            output.object_prefix = prefix;
        }
        if let Some(extension) = self.object_extension {
            output.object_extension = extension;
        }
        output.overwrite |= self.overwrite;
        output.link_rules |= self.link_rules;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Deps { project, output } => {
            project.apply(&mut config);
            output.apply(&mut config);
            cmd_deps(config)?;
        }
        Commands::Order { project, format } => {
            project.apply(&mut config);
            cmd_order(config, format)?;
        }
        Commands::Preprocess {
            input,
            output,
            macros,
            search_paths,
            overwrite,
        } => {
            config.preprocess.macros.extend(macros);
            config.preprocess.search_paths.extend(search_paths);
            cmd_preprocess(&config, &input, output.as_deref(), overwrite)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_deps(config: Config) -> Result<()> {
    let listing = config.output.listing.clone();
    let outcome = Project::new(config).run()?;
    println!(
        "{} file(s), {} dependency edge(s) written to {}",
        outcome.files.len(),
        outcome.listing.edges().len(),
        listing.display()
    );
    Ok(())
}

fn cmd_order(config: Config, format: Format) -> Result<()> {
    let outcome = Project::new(config).analyze()?;

    match format {
        Format::Text => {
            for file in outcome.compile_order()? {
                println!("{}", file.display());
            }
        }
        Format::Json => {
            let entries = outcome.order_entries()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}

fn cmd_preprocess(config: &Config, input: &Path, output: Option<&Path>, overwrite: bool) -> Result<()> {
    let mut macros = MacroTable::from_seeds(&config.preprocess.macros)?;
    let preprocessor = Preprocessor::new(config.preprocess.search_paths.clone());
    let lines = preprocessor.preprocess_file(input, &mut macros)?;

    let mut text = String::new();
    for line in &lines {
        text.push_str(&line.text);
        text.push('\n');
    }

    match output {
        Some(path) => {
            write_atomic(path, &text, overwrite)
                .with_context(|| format!("writing preprocessed {}", input.display()))?;
            info!("Wrote {} line(s) to {}", lines.len(), path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
