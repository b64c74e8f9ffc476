//! Dependencies between cache namespaces.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::key::Namespace;

/// Directed edges meaning "when A is invalidated, B is stale too".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationGraph {
  edges: BTreeMap<Namespace, BTreeSet<Namespace>>,
}

impl InvalidationGraph {
  /// Graph with no edges.
  pub fn empty() -> Self {
    Self {
      edges: BTreeMap::new(),
    }
  }

  /// Add an edge `from -> to`.
  pub fn with_edge(mut self, from: Namespace, to: Namespace) -> Self {
    self.add_edge(from, to);
    self
  }

  pub fn add_edge(&mut self, from: Namespace, to: Namespace) {
    if from != to {
      self.edges.entry(from).or_default().insert(to);
    }
  }

  /// Every namespace reachable from `root`, excluding `root` itself.
  ///
  /// Breadth-first, so direct dependents come before transitive ones.
  pub fn dependents(&self, root: Namespace) -> Vec<Namespace> {
    let mut visited = BTreeSet::from([root]);
    let mut queue = VecDeque::from([root]);
    let mut out = Vec::new();

    while let Some(node) = queue.pop_front() {
      let Some(targets) = self.edges.get(&node) else {
        continue;
      };
      for &target in targets {
        if visited.insert(target) {
          out.push(target);
          queue.push_back(target);
        }
      }
    }

    out
  }
}

impl Default for InvalidationGraph {
  fn default() -> Self {
    use Namespace::*;

    Self::empty()
      // A drifting record count on the dashboard means the transaction set changed
      .with_edge(Dashboard, Transactions)
      .with_edge(Dashboard, Reports)
      .with_edge(Dashboard, Statistics)
      // Any transaction write shows up in every aggregate view
      .with_edge(Transactions, Dashboard)
      .with_edge(Transactions, Statistics)
      .with_edge(Transactions, Reports)
  }
}
