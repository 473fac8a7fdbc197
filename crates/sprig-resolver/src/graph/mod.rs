//! Dependency graph implementation using petgraph
//!
//! Records which resolved package depends on which, detects cycles and
//! produces the installation order (dependencies before dependents).

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sprig_core::types::{DependencyKind, Version, VersionReq};

/// Unique identifier for a resolved package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    /// Normalized package name
    pub name: String,
    /// Resolved version
    pub version: Version,
}

/// Edge from a dependent to one of its dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Constraint the dependent placed on the dependency
    pub constraint: VersionReq,
    /// Why the dependency was pulled in
    pub kind: DependencyKind,
}

/// Graph operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Package not found in graph: {name}")]
    PackageNotFound { name: String },

    #[error("Circular dependency detected: {cycle}")]
    Cycle { cycle: String },
}

/// Resolved dependency graph, one node per package name
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Underlying directed graph, edges point from dependent to dependency
    graph: DiGraph<PackageId, DependencyEdge>,
    /// Map from package name to NodeIndex for fast lookups
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package node, returning the existing node if the name is known
    pub fn add_package(&mut self, package: PackageId) -> NodeIndex {
        if let Some(existing_index) = self.node_map.get(&package.name) {
            return *existing_index;
        }

        let name = package.name.clone();
        let node_index = self.graph.add_node(package);
        self.node_map.insert(name, node_index);

        node_index
    }

    /// Add dependency edge between two packages; duplicate edges are ignored
    pub fn add_dependency(
        &mut self,
        dependent: &str,
        dependency: &str,
        edge: DependencyEdge,
    ) -> Result<(), GraphError> {
        let from_index = self.index_of(dependent)?;
        let to_index = self.index_of(dependency)?;

        if self.graph.find_edge(from_index, to_index).is_none() {
            self.graph.add_edge(from_index, to_index, edge);
        }

        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::PackageNotFound {
                name: name.to_string(),
            })
    }

    /// Get package node by name
    pub fn get_package(&self, name: &str) -> Option<&PackageId> {
        let node_index = self.node_map.get(name)?;
        self.graph.node_weight(*node_index)
    }

    /// Get all packages in insertion order
    pub fn packages(&self) -> impl Iterator<Item = &PackageId> {
        self.graph.node_weights()
    }

    /// Direct dependencies of a package with their edges
    pub fn dependencies_of(&self, name: &str) -> Vec<(&PackageId, &DependencyEdge)> {
        let Some(&index) = self.node_map.get(name) else {
            return Vec::new();
        };

        let mut dependencies: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (&self.graph[edge.target()], edge.weight()))
            .collect();
        dependencies.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        dependencies
    }

    /// Shortest chain of dependency edges leading from `from` to `to`,
    /// both ends included
    pub fn path_between(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let start = *self.node_map.get(from)?;
        let goal = *self.node_map.get(to)?;

        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut seen = HashSet::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = vec![self.graph[current].name.clone()];
                let mut node = current;
                while let Some(&prev) = previous.get(&node) {
                    path.push(self.graph[prev].name.clone());
                    node = prev;
                }
                path.reverse();
                return Some(path);
            }

            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if seen.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Detect cycles in the dependency graph
    pub fn detect_cycles(&self) -> Result<(), Vec<PackageId>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle_node) => Err(self.extract_cycle_path(cycle_node.node_id())),
        }
    }

    /// Walk from a node known to sit on a cycle until a node repeats
    fn extract_cycle_path(&self, start_node: NodeIndex) -> Vec<PackageId> {
        let mut visited = HashSet::new();
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut current = start_node;

        while visited.insert(current) {
            path.push(current);
            // Follow the first outgoing edge that can still reach a cycle
            let next = self
                .graph
                .edges(current)
                .map(|edge| edge.target())
                .find(|target| petgraph::algo::has_path_connecting(&self.graph, *target, current, None));
            match next {
                Some(next) => current = next,
                None => break,
            }
        }

        let cycle_start = path.iter().position(|idx| *idx == current).unwrap_or(0);
        path[cycle_start..]
            .iter()
            .map(|idx| self.graph[*idx].clone())
            .collect()
    }

    /// Format cycle as "a -> b -> c -> a"
    pub fn format_cycle(cycle: &[PackageId]) -> String {
        if cycle.is_empty() {
            return "No cycle".to_string();
        }

        let mut names: Vec<&str> = cycle.iter().map(|id| id.name.as_str()).collect();
        names.push(names[0]);
        names.join(" -> ")
    }

    /// Get number of packages in the graph
    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of dependencies in the graph
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check for cycles and return detailed error if found
    pub fn validate_no_cycles(&self) -> Result<(), GraphError> {
        self.detect_cycles().map_err(|cycle| GraphError::Cycle {
            cycle: Self::format_cycle(&cycle),
        })
    }

    /// Installation order: every package appears after all of its dependencies.
    ///
    /// Kahn's algorithm over outgoing-edge counts; among packages that are
    /// ready at the same time, the one added to the graph first goes first.
    pub fn installation_order(&self) -> Result<Vec<PackageId>, GraphError> {
        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.edges_directed(idx, Direction::Outgoing).count())
            .collect();

        let mut ready: BTreeSet<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| pending[idx.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = ready.pop_first() {
            order.push(self.graph[idx].clone());

            for dependent in self.graph.neighbors_directed(idx, Direction::Incoming) {
                let remaining = &mut pending[dependent.index()];
                *remaining -= 1;
                if *remaining == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.graph.node_count() {
            self.validate_no_cycles()?;
        }

        Ok(order)
    }
}

impl PackageId {
    /// Create a new package ID
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl DependencyEdge {
    /// Create a new dependency edge
    pub fn new(constraint: VersionReq, kind: DependencyKind) -> Self {
        Self { constraint, kind }
    }

    /// Create a required dependency edge
    pub fn required(constraint: VersionReq) -> Self {
        Self::new(constraint, DependencyKind::Required)
    }

    /// Create an edge activated by an extra
    pub fn extra(constraint: VersionReq, extra: &str) -> Self {
        Self::new(constraint, DependencyKind::Extra(extra.to_string()))
    }
}
