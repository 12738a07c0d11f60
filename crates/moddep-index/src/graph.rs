//! File dependency graph
//!
//! The resolved graph between source files, used for cycle detection, compile order
//! and link closures.

use moddep_core::{Error, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Dependency graph for resolving compilation order.
///
/// Nodes keep the order they were added in, which is the discovery order; every
/// ordering the graph produces breaks ties by it.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Files in discovery order
    files: Vec<PathBuf>,
    /// File → position in `files`
    positions: HashMap<PathBuf, usize>,
    /// Edges: file -> files it depends on, by position
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with its prerequisites.
    ///
    /// Prerequisites not yet in the graph are added as nodes without edges; adding a
    /// file twice replaces its edges.
    pub fn add_file(&mut self, file: &Path, prerequisites: &[PathBuf]) {
        let node = self.node(file);
        let deps = prerequisites.iter().map(|p| self.node(p)).collect();
        self.edges[node] = deps;
    }

    fn node(&mut self, file: &Path) -> usize {
        if let Some(&position) = self.positions.get(file) {
            return position;
        }
        let position = self.files.len();
        self.files.push(file.to_path_buf());
        self.positions.insert(file.to_path_buf(), position);
        self.edges.push(Vec::new());
        position
    }

    /// Files in discovery order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn contains(&self, file: &Path) -> bool {
        self.positions.contains_key(file)
    }

    /// Direct prerequisites of a file
    pub fn prerequisites(&self, file: &Path) -> Vec<&Path> {
        self.positions
            .get(file)
            .map(|&node| self.edges[node].iter().map(|&d| self.files[d].as_path()).collect())
            .unwrap_or_default()
    }

    /// Fail with the files on a cycle, if there is one
    pub fn check_acyclic(&self) -> Result<()> {
        match self.find_cycle() {
            Some(cycle) => Err(Error::DependencyCycle { cycle }),
            None => Ok(()),
        }
    }

    /// Perform topological sort to get compilation order.
    ///
    /// Prerequisites come before the files that use them; among files that are ready
    /// at the same time the earliest discovered goes first.
    pub fn compile_order(&self) -> Result<Vec<PathBuf>> {
        // Kahn's algorithm over positions; a node's in-degree is its number of deps
        let mut in_degree: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.files.len()];
        for (node, deps) in self.edges.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(node);
            }
        }

        let mut ready: BTreeSet<usize> = (0..self.files.len())
            .filter(|&node| in_degree[node] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.files.len());

        while let Some(node) = ready.pop_first() {
            order.push(self.files[node].clone());
            for &dependent in &dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.files.len() {
            self.check_acyclic()?;
        }
        Ok(order)
    }

    /// Every file `file` needs, directly or indirectly, sorted by path
    pub fn transitive_prerequisites(&self, file: &Path) -> Vec<PathBuf> {
        let Some(&start) = self.positions.get(file) else {
            return Vec::new();
        };
        let mut seen: HashSet<usize> = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &dep in &self.edges[node] {
                if dep != start && seen.insert(dep) {
                    stack.push(dep);
                }
            }
        }

        let mut files: Vec<PathBuf> = seen.into_iter().map(|n| self.files[n].clone()).collect();
        files.sort();
        files
    }

    /// Find a cycle in the graph, starting and ending at the same file.
    ///
    /// Depth-first search on an explicit stack of `(node, next edge)` frames, so long
    /// dependency chains do not grow the call stack.
    fn find_cycle(&self) -> Option<Vec<PathBuf>> {
        let mut visited = vec![false; self.files.len()];
        let mut on_stack = vec![false; self.files.len()];

        for root in 0..self.files.len() {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            on_stack[root] = true;
            let mut frames: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = frames.last_mut() {
                let (node, next) = *frame;
                let Some(&dep) = self.edges[node].get(next) else {
                    on_stack[node] = false;
                    frames.pop();
                    continue;
                };
                frame.1 += 1;

                if on_stack[dep] {
                    // the walk may have entered the cycle from outside it
                    let start = frames.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                    let mut cycle: Vec<PathBuf> =
                        frames[start..].iter().map(|&(n, _)| self.files[n].clone()).collect();
                    cycle.push(self.files[dep].clone());
                    return Some(cycle);
                }
                if !visited[dep] {
                    visited[dep] = true;
                    on_stack[dep] = true;
                    frames.push((dep, 0));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moddep_core::ErrorKind;

    fn p(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    #[test]
    fn test_simple_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_file(Path::new("main.f90"), &[p("utils.f90")]);
        graph.add_file(Path::new("utils.f90"), &[]);

        let order = graph.compile_order().unwrap();
        assert_eq!(order, vec![p("utils.f90"), p("main.f90")]);
    }

    #[test]
    fn test_ties_follow_discovery_order() {
        let mut graph = DependencyGraph::new();
        graph.add_file(Path::new("z.f90"), &[]);
        graph.add_file(Path::new("app.f90"), &[p("m.f90"), p("z.f90")]);
        graph.add_file(Path::new("b.f90"), &[]);
        graph.add_file(Path::new("m.f90"), &[p("b.f90")]);

        let order = graph.compile_order().unwrap();
        assert_eq!(order, vec![p("z.f90"), p("b.f90"), p("m.f90"), p("app.f90")]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_file(Path::new("entry.f90"), &[p("a.f90")]);
        graph.add_file(Path::new("a.f90"), &[p("b.f90")]);
        graph.add_file(Path::new("b.f90"), &[p("a.f90")]);

        let err = graph.check_acyclic().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencyCycle);
        match &err {
            Error::DependencyCycle { cycle } => {
                assert_eq!(cycle, &vec![p("a.f90"), p("b.f90"), p("a.f90")]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.to_string().contains("a.f90 -> b.f90 -> a.f90"));

        assert!(graph.compile_order().is_err());
    }

    #[test]
    fn test_transitive_prerequisites() {
        let mut graph = DependencyGraph::new();
        graph.add_file(Path::new("main.f90"), &[p("solver.f90"), p("io.f90")]);
        graph.add_file(Path::new("solver.f90"), &[p("grid.f90"), p("kinds.f90")]);
        graph.add_file(Path::new("grid.f90"), &[p("kinds.f90")]);
        graph.add_file(Path::new("io.f90"), &[p("kinds.f90")]);

        assert_eq!(
            graph.transitive_prerequisites(Path::new("main.f90")),
            vec![p("grid.f90"), p("io.f90"), p("kinds.f90"), p("solver.f90")]
        );
        assert!(graph.transitive_prerequisites(Path::new("kinds.f90")).is_empty());
        assert_eq!(graph.prerequisites(Path::new("grid.f90")), vec![Path::new("kinds.f90")]);
    }

    #[test]
    fn test_long_chain_cycle_search() {
        let depth = 100_000;
        let name = |i: usize| p(&format!("m{}.f90", i));
        let mut graph = DependencyGraph::new();
        for i in 0..depth {
            graph.add_file(&name(i), &[name(i + 1)]);
        }
        graph.check_acyclic().unwrap();
        assert_eq!(graph.compile_order().unwrap().first(), Some(&name(depth)));

        graph.add_file(&name(depth), &[name(depth - 1)]);
        match graph.check_acyclic().unwrap_err() {
            Error::DependencyCycle { cycle } => {
                assert_eq!(cycle, vec![name(depth - 1), name(depth), name(depth - 1)]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
