//! Dependency graph between top-level stacks.
//!
//! Edges come only from cross-top-level references: a consumer stack must be
//! deployed after the stack whose export it imports. Nested stacks are
//! deployed as part of their top-level stack and never appear here.
//!
//! The graph provides:
//! - Per-stack dependency lists, de-duplicated, in the order edges were added
//! - Cycle detection that reports every participating stack
//! - A deploy order and parallel deploy waves

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::construct::NodeId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
  #[error("dependency cycle between stacks: {}", stacks.join(" -> "))]
  Cycle { stacks: Vec<String> },

  #[error("stack {0} is not part of the dependency graph")]
  UnknownStack(NodeId),
}

/// Edges run from a dependency to its dependent, so a topological order is
/// a valid deploy order.
#[derive(Debug, Default)]
pub struct StackGraph {
  graph: DiGraph<NodeId, ()>,
  nodes: HashMap<NodeId, NodeIndex>,
  names: BTreeMap<NodeId, String>,
  dependencies: BTreeMap<NodeId, Vec<NodeId>>,
}

impl StackGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a top-level stack. Registering twice is a no-op.
  pub fn add_stack(&mut self, stack: NodeId, name: impl Into<String>) {
    if self.nodes.contains_key(&stack) {
      return;
    }
    let idx = self.graph.add_node(stack);
    self.nodes.insert(stack, idx);
    self.names.insert(stack, name.into());
  }

  /// Record that `dependent` must be deployed after `dependency`. Returns
  /// `false` if the edge was already present.
  pub fn add_dependency(&mut self, dependent: NodeId, dependency: NodeId) -> bool {
    let deps = self.dependencies.entry(dependent).or_default();
    if deps.contains(&dependency) {
      return false;
    }
    deps.push(dependency);

    let from = self.index(dependency);
    let to = self.index(dependent);
    self.graph.add_edge(from, to, ());
    true
  }

  fn index(&mut self, stack: NodeId) -> NodeIndex {
    if let Some(&idx) = self.nodes.get(&stack) {
      return idx;
    }
    let idx = self.graph.add_node(stack);
    self.nodes.insert(stack, idx);
    idx
  }

  pub fn name(&self, stack: NodeId) -> String {
    self.names.get(&stack).cloned().unwrap_or_else(|| stack.to_string())
  }

  /// Stacks `stack` depends on, in the order the dependencies were found.
  pub fn dependencies_of(&self, stack: NodeId) -> &[NodeId] {
    self.dependencies.get(&stack).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Every `(dependent, dependency)` pair.
  pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
    self
      .dependencies
      .iter()
      .flat_map(|(dependent, deps)| deps.iter().map(move |dep| (*dependent, *dep)))
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  /// Verify that the graph is acyclic, naming every stack on a cycle.
  pub fn verify_acyclic(&self) -> Result<(), GraphError> {
    if toposort(&self.graph, None).is_ok() {
      return Ok(());
    }

    let mut stacks: Vec<NodeId> = tarjan_scc(&self.graph)
      .into_iter()
      .filter(|component| component.len() > 1 || self.graph.contains_edge(component[0], component[0]))
      .flatten()
      .map(|idx| self.graph[idx])
      .collect();
    stacks.sort();

    Err(GraphError::Cycle {
      stacks: stacks.into_iter().map(|s| self.name(s)).collect(),
    })
  }

  /// Stacks in an order where every stack follows its dependencies.
  pub fn deploy_order(&self) -> Result<Vec<NodeId>, GraphError> {
    self.verify_acyclic()?;
    self.deploy_waves().map(|waves| waves.into_iter().flatten().collect())
  }

  /// Stacks grouped into waves that can be deployed in parallel: every
  /// stack's dependencies are in earlier waves.
  pub fn deploy_waves(&self) -> Result<Vec<Vec<NodeId>>, GraphError> {
    // Kahn's algorithm, one level at a time
    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    for idx in self.graph.node_indices() {
      in_degree.insert(idx, self.graph.neighbors_directed(idx, Direction::Incoming).count());
    }

    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let mut ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[*idx] == 0).copied().collect();
      if ready.is_empty() {
        return Err(self.verify_acyclic().err().unwrap_or(GraphError::Cycle { stacks: Vec::new() }));
      }
      ready.sort_by_key(|idx| self.graph[*idx]);

      for idx in &ready {
        remaining.remove(idx);
        for neighbor in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      waves.push(ready.into_iter().map(|idx| self.graph[idx]).collect());
    }

    Ok(waves)
  }

  /// Names of the stacks `stack` depends on.
  pub fn dependency_names(&self, stack: NodeId) -> Result<Vec<String>, GraphError> {
    if !self.nodes.contains_key(&stack) {
      return Err(GraphError::UnknownStack(stack));
    }
    Ok(self.dependencies_of(stack).iter().map(|s| self.name(*s)).collect())
  }
}
