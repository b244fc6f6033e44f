//! Resource Dependency Tracking
//!
//! Every typed reference between declarations is an ordering edge: the
//! referenced resource must exist before the one holding the reference. This
//! module keeps those edges in a graph so that they can be:
//!
//! - Ordered for deployment
//! - Checked for cycles (explicit `depends_on` edges can introduce them)
//! - Queried (what does a resource need, what needs it)
//! - Rendered as DOT

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::resources::ResourceKind;

/// A node in the dependency graph representing a declared construct
#[derive(Debug, Clone, Serialize)]
pub struct DependencyNode {
    /// Construct path relative to the stack
    pub path: String,
    /// Template logical id of the construct's primary resource
    pub logical_id: String,
    /// Resource kind
    pub kind: ResourceKind,
}

impl DependencyNode {
    pub fn new(path: impl Into<String>, logical_id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            path: path.into(),
            logical_id: logical_id.into(),
            kind,
        }
    }
}

/// Why one construct depends on another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// The dependent holds a typed handle to the dependency
    Reference,
    /// The dependent is placed in the dependency's subnets
    Placement,
    /// Declared with `Stack::add_dependency`
    Explicit,
}

/// An edge: `to` depends on `from`
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDependency {
    /// Path of the resource that must exist first
    pub from: String,
    /// Path of the dependent resource
    pub to: String,
    pub dependency_type: DependencyType,
}

/// The dependency graph for one stack
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, ResourceDependency>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any node with the same path
    pub fn add_node(&mut self, node: DependencyNode) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&node.path) {
            if let Some(existing) = self.graph.node_weight_mut(idx) {
                *existing = node;
            }
            return idx;
        }

        let path = node.path.clone();
        let idx = self.graph.add_node(node);
        self.node_indices.insert(path, idx);
        idx
    }

    /// Record that `dependent` needs `dependency`. Duplicate edges are collapsed.
    pub fn add_dependency(
        &mut self,
        dependency: &str,
        dependent: &str,
        dependency_type: DependencyType,
    ) -> Result<()> {
        let from_idx = *self
            .node_indices
            .get(dependency)
            .ok_or_else(|| Error::validation(dependency, "unknown construct in dependency"))?;
        let to_idx = *self
            .node_indices
            .get(dependent)
            .ok_or_else(|| Error::validation(dependent, "unknown construct in dependency"))?;

        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return Ok(());
        }

        self.graph.add_edge(
            from_idx,
            to_idx,
            ResourceDependency {
                from: dependency.to_string(),
                to: dependent.to_string(),
                dependency_type,
            },
        );
        Ok(())
    }

    /// Check for dependency cycles
    pub fn has_cycles(&self) -> bool {
        !self.cycles().is_empty()
    }

    /// All strongly connected components with more than one node, plus self loops
    pub fn cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                scc.into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).map(|n| n.path.clone()))
                    .collect()
            })
            .collect()
    }

    /// Construct paths in an order where every resource follows its dependencies
    pub fn deployment_order(&self) -> Result<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).map(|n| n.path.clone()))
                .collect()),
            Err(_) => Err(Error::DependencyCycle(self.first_cycle())),
        }
    }

    /// One cycle as construct paths in edge order, starting and ending at the
    /// same path. Empty when the graph is acyclic.
    fn first_cycle(&self) -> Vec<String> {
        let Some(scc) = tarjan_scc(&self.graph).into_iter().find(|scc| {
            scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
        }) else {
            return Vec::new();
        };

        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let path_of = |idx: NodeIndex| self.graph[idx].path.clone();
        let Some(start) = scc.into_iter().min_by_key(|idx| path_of(*idx)) else {
            return Vec::new();
        };

        // Shortest walk from `start` back to itself inside the component.
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut closing = None;
        while let Some(current) = queue.pop_front() {
            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .filter(|n| members.contains(n))
                .collect();
            next.sort_by_key(|n| path_of(*n));
            if next.contains(&start) {
                closing = Some(current);
                break;
            }
            for neighbor in next {
                if neighbor != start && !parent.contains_key(&neighbor) {
                    parent.insert(neighbor, current);
                    queue.push_back(neighbor);
                }
            }
        }

        let mut between = Vec::new();
        let mut node = closing;
        while let Some(current) = node.filter(|n| *n != start) {
            between.push(path_of(current));
            node = parent.get(&current).copied();
        }
        between.reverse();

        let mut cycle = Vec::with_capacity(between.len() + 2);
        cycle.push(path_of(start));
        cycle.extend(between);
        cycle.push(path_of(start));
        cycle
    }

    /// Everything `path` needs, directly or transitively
    pub fn dependencies_of(&self, path: &str) -> Vec<String> {
        self.walk(path, Direction::Incoming)
    }

    /// Everything that needs `path`, directly or transitively
    pub fn dependents_of(&self, path: &str) -> Vec<String> {
        self.walk(path, Direction::Outgoing)
    }

    fn walk(&self, path: &str, direction: Direction) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut queue = VecDeque::new();

        if let Some(&start) = self.node_indices.get(path) {
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, direction) {
                    if seen.insert(neighbor) {
                        if let Some(node) = self.graph.node_weight(neighbor) {
                            found.push(node.path.clone());
                        }
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        found.sort();
        found
    }

    /// Direct dependencies of `path`, as edges
    pub fn direct_dependencies(&self, path: &str) -> Vec<&ResourceDependency> {
        self.node_indices
            .get(path)
            .map(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| e.weight())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node(&self, path: &str) -> Option<&DependencyNode> {
        self.node_indices
            .get(path)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &ResourceDependency> {
        self.graph.edge_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Generate a DOT format representation for visualization
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph dependencies {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in self.graph.node_weights() {
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{}\"];\n",
                node.path, node.path, node.kind
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let dep = edge.weight();
            let style = match dep.dependency_type {
                DependencyType::Reference => "solid",
                DependencyType::Placement => "dashed",
                DependencyType::Explicit => "bold",
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}];\n",
                dep.from, dep.to, style
            ));
        }

        output.push_str("}\n");
        output
    }
}
