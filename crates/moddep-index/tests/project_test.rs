//! Integration tests for whole-project runs
//!
//! Each test lays out a small source tree on disk and runs discovery through listing
//! output.

use moddep_core::config::{Config, ErrorMode};
use moddep_core::{Error, ErrorKind};
use moddep_index::{Project, HEADER};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Tree {
    temp: TempDir,
}

impl Tree {
    fn new(files: &[(&str, &str)]) -> Self {
        let temp = TempDir::new().unwrap();
        let tree = Self { temp };
        for (name, text) in files {
            tree.write(name, text);
        }
        tree
    }

    fn write(&self, name: &str, text: &str) {
        let path = self.src().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn src(&self) -> PathBuf {
        self.temp.path().join("src")
    }

    fn out(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.discovery.roots = vec![self.src()];
        config.output.listing = self.out("depends.mak");
        config.output.manifest = self.out("objects.mak");
        config
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.out(name)).unwrap()
    }
}

fn kinds(errors: &[Error]) -> Vec<ErrorKind> {
    errors.iter().map(|e| e.kind()).collect()
}

/// A module used by another module becomes its prerequisite
#[test]
fn test_use_becomes_prerequisite() {
    let tree = Tree::new(&[
        ("A.f90", "module a\nend module a\n"),
        ("B.f90", "module b\n  use a\nend module b\n"),
    ]);
    let mut config = tree.config();
    config.resolve.skip_modules.clear();
    config.output.object_prefix = "build/obj".into();

    let outcome = Project::new(config).run().unwrap();

    let edges: Vec<String> = outcome.listing.edges().iter().map(|e| e.to_string()).collect();
    assert_eq!(edges, vec!["build/obj/B.o : build/obj/A.o"]);
    assert_eq!(tree.read("depends.mak"), format!("{}build/obj/B.o : build/obj/A.o\n", HEADER));
    assert_eq!(
        tree.read("objects.mak"),
        format!("{}build/obj/A.o\nbuild/obj/B.o\n", HEADER)
    );
}

/// Skip-set modules are satisfied without a defining file
#[test]
fn test_skipped_module_needs_no_definition() {
    let tree = Tree::new(&[(
        "C.f90",
        "module c\n  use mpi\n  use, intrinsic :: iso_c_binding\n  use iso_fortran_env\nend module c\n",
    )]);
    let mut config = tree.config();
    config.resolve.skip_modules = vec!["mpi".into()];

    let outcome = Project::new(config).run().unwrap();
    assert!(outcome.listing.edges().is_empty());
    assert_eq!(tree.read("depends.mak"), HEADER);
}

/// Two files declaring the same module abort the run
#[test]
fn test_duplicate_definition_names_both_files() {
    let tree = Tree::new(&[
        ("x1.f90", "module x\nend module x\n"),
        ("x2.f90", "module x\nend module x\n"),
    ]);

    let failures = Project::new(tree.config()).run().unwrap_err();
    assert_eq!(kinds(failures.errors()), vec![ErrorKind::DuplicateDefinition]);
    let message = failures.errors()[0].to_string();
    assert!(message.contains("x1.f90") && message.contains("x2.f90"), "{}", message);
    assert!(!tree.out("depends.mak").exists());
}

/// Accumulate mode reports every file's error; fail-fast reports one
#[test]
fn test_accumulate_and_fail_fast() {
    let tree = Tree::new(&[
        ("a_bare.f90", "subroutine helper()\nend subroutine helper\n"),
        ("b_cond.F90", "module b\n#ifdef X\n  use a\n#elif Y\n#endif\nend module b\n"),
        ("c_two.f90", "module c1\nend module\nmodule c2\nend module\n"),
        ("d_ok.f90", "module d\nend module d\n"),
    ]);

    let failures = Project::new(tree.config()).analyze().unwrap_err();
    assert_eq!(
        kinds(failures.errors()),
        vec![
            ErrorKind::NoDeclarationFound,
            ErrorKind::MalformedDirective,
            ErrorKind::MultipleDeclarationsFound,
        ]
    );
    assert!(failures.to_string().starts_with("3 error"));

    let mut config = tree.config();
    config.resolve.mode = ErrorMode::FailFast;
    let failures = Project::new(config).analyze().unwrap_err();
    assert_eq!(failures.len(), 1);
}

/// Unresolved modules are project-global and reported for every using file
#[test]
fn test_unresolved_modules_are_all_reported() {
    let tree = Tree::new(&[
        ("a.f90", "module a\n  use nowhere\nend module a\n"),
        ("b.f90", "module b\n  use a\n  use also_nowhere\nend module b\n"),
    ]);

    let failures = Project::new(tree.config()).run().unwrap_err();
    assert_eq!(
        kinds(failures.errors()),
        vec![ErrorKind::UnresolvedModule, ErrorKind::UnresolvedModule]
    );
    assert!(failures.errors()[1].to_string().contains("also_nowhere"));
    assert!(!tree.out("depends.mak").exists());
}

/// The listing does not depend on the order files were created in
#[test]
fn test_listing_is_deterministic() {
    let files = [
        ("kinds.f90", "module kinds\nend module\n"),
        ("grid.f90", "module grid\n  use kinds\nend module\n"),
        ("solver.f90", "module solver\n  use kinds\n  use grid\nend module\n"),
        ("io/writer.f90", "module writer\n  use solver\n  use grid\nend module\n"),
    ];
    let forward = Tree::new(&files);
    let mut reversed = files;
    reversed.reverse();
    let backward = Tree::new(&reversed);

    Project::new(forward.config()).run().unwrap();
    Project::new(backward.config()).run().unwrap();

    let expected = format!(
        "{}grid.o : kinds.o\nwriter.o : grid.o\nwriter.o : solver.o\nsolver.o : grid.o\nsolver.o : kinds.o\n",
        HEADER
    );
    assert_eq!(forward.read("depends.mak"), expected);
    assert_eq!(backward.read("depends.mak"), expected);
}

/// Macro seeds decide which use statements survive
#[test]
fn test_macro_seeds_select_dependencies() {
    let tree = Tree::new(&[
        ("comm_mpi.f90", "module comm_mpi\nend module\n"),
        ("comm_serial.f90", "module comm_serial\nend module\n"),
        (
            "driver.F90",
            "program driver\n#ifdef USE_MPI\n  use comm_mpi\n#else\n  use comm_serial\n#endif\nend program\n",
        ),
    ]);

    let serial = Project::new(tree.config()).analyze().unwrap();
    assert_eq!(serial.listing.edges()[0].prerequisite, "comm_serial.o");

    let mut config = tree.config();
    config.preprocess.macros = vec!["USE_MPI".into()];
    let parallel = Project::new(config).analyze().unwrap();
    assert_eq!(parallel.listing.edges()[0].prerequisite, "comm_mpi.o");
}

/// Excluded files define modules for others but their own uses are never checked
#[test]
fn test_excluded_files() {
    let tree = Tree::new(&[
        ("legacy.f90", "module legacy\n  use vendor_only\nend module\n"),
        ("broken.f90", "subroutine s()\nend subroutine\n"),
        ("app.f90", "program app\n  use legacy\nend program\n"),
    ]);
    let mut config = tree.config();
    config.discovery.exclude = vec![tree.src().join("legacy.f90"), tree.src().join("broken.f90")];

    let outcome = Project::new(config).run().unwrap();
    let edges: Vec<String> = outcome.listing.edges().iter().map(|e| e.to_string()).collect();
    assert_eq!(edges, vec!["app.o : legacy.o"]);
    assert_eq!(outcome.manifest(), vec!["app.o", "broken.o", "legacy.o"]);
}

/// Circular module dependencies are rejected
#[test]
fn test_cycle_is_an_error() {
    let tree = Tree::new(&[
        ("a.f90", "module a\n  use b\nend module\n"),
        ("b.f90", "module b\n  use a\nend module\n"),
    ]);

    let failures = Project::new(tree.config()).run().unwrap_err();
    assert_eq!(kinds(failures.errors()), vec![ErrorKind::DependencyCycle]);
    assert!(failures.errors()[0].to_string().contains("a.f90 -> "));
}

/// Files compiling to the same object are rejected
#[test]
fn test_object_collision() {
    let tree = Tree::new(&[
        ("one/io.f90", "module io_one\nend module\n"),
        ("two/io.F90", "module io_two\nend module\n"),
    ]);

    let failures = Project::new(tree.config()).analyze().unwrap_err();
    assert_eq!(kinds(failures.errors()), vec![ErrorKind::DuplicateObject]);
}

/// Compile order and link rules follow the resolved graph
#[test]
fn test_compile_order_and_link_rules() {
    let tree = Tree::new(&[
        ("main.f90", "program main\n  use solver\nend program main\n"),
        ("solver.f90", "module solver\n  use kinds\nend module\n"),
        ("kinds.f90", "module kinds\nend module\n"),
        ("unused.f90", "module unused\nend module\n"),
    ]);
    let mut config = tree.config();
    config.output.link_rules = true;
    config.output.object_prefix = "obj".into();

    let outcome = Project::new(config).run().unwrap();
    let order: Vec<String> = outcome
        .compile_order()
        .unwrap()
        .iter()
        .map(|p| file_name(p))
        .collect();
    assert_eq!(order, vec!["kinds.f90", "solver.f90", "main.f90", "unused.f90"]);

    let links: Vec<String> = outcome.listing.link_rules().iter().map(|e| e.to_string()).collect();
    assert_eq!(
        links,
        vec!["obj/main : obj/kinds.o", "obj/main : obj/main.o", "obj/main : obj/solver.o"]
    );
    assert!(tree.read("depends.mak").contains("# link rules\nobj/main : obj/kinds.o\n"));

    let entries = outcome.order_entries().unwrap();
    let json = serde_json::to_value(&entries).unwrap();
    assert_eq!(json[2]["kind"], "program");
    assert_eq!(json[2]["name"], "main");
    assert_eq!(json[2]["object"], "obj/main.o");
    assert_eq!(entries[1].prerequisites, vec![tree.src().join("kinds.f90")]);
}

/// An existing listing is only replaced with overwrite set
#[test]
fn test_overwrite_guard() {
    let tree = Tree::new(&[("a.f90", "module a\nend module\n")]);
    fs::write(tree.out("depends.mak"), "keep me\n").unwrap();

    let failures = Project::new(tree.config()).run().unwrap_err();
    assert_eq!(kinds(failures.errors()), vec![ErrorKind::OutputExists]);
    assert_eq!(tree.read("depends.mak"), "keep me\n");

    let mut config = tree.config();
    config.output.overwrite = true;
    Project::new(config).run().unwrap();
    assert_eq!(tree.read("depends.mak"), HEADER);
}

/// A refused manifest leaves the listing unwritten too
#[test]
fn test_existing_manifest_blocks_every_output() {
    let tree = Tree::new(&[
        ("a.f90", "module a\nend module\n"),
        ("b.f90", "module b\n  use a\nend module\n"),
    ]);
    fs::write(tree.out("objects.mak"), "stale.o\n").unwrap();

    let failures = Project::new(tree.config()).run().unwrap_err();
    assert_eq!(kinds(failures.errors()), vec![ErrorKind::OutputExists]);
    assert!(failures.errors()[0].to_string().contains("objects.mak"));
    assert!(!tree.out("depends.mak").exists());
    assert_eq!(tree.read("objects.mak"), "stale.o\n");

    let mut leftovers: Vec<String> = fs::read_dir(tree.temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    leftovers.sort();
    assert_eq!(leftovers, vec!["objects.mak", "src"]);
}

/// Explicit file lists write no manifest
#[test]
fn test_explicit_files_skip_manifest() {
    let tree = Tree::new(&[
        ("a.f90", "module a\nend module\n"),
        ("b.f90", "module b\n  use a\nend module\n"),
    ]);
    let mut config = tree.config();
    config.discovery.files = vec![tree.src().join("b.f90"), tree.src().join("a.f90")];

    let outcome = Project::new(config).run().unwrap();
    assert_eq!(outcome.listing.edges().len(), 1);
    assert!(!tree.out("objects.mak").exists());
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
