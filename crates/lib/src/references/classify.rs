use std::fmt;

use crate::construct::{NodeId, Tree};
use crate::placeholder::ResolveError;

/// How a reference crosses stack boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
  SameStack,
  AncestorToNestedDescendant,
  NestedDescendantToAncestor,
  CrossTopLevelSibling,
  SiblingNestedUnderSharedParent,
}

impl fmt::Display for Boundary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Boundary::SameStack => "same-stack",
      Boundary::AncestorToNestedDescendant => "ancestor-to-nested-descendant",
      Boundary::NestedDescendantToAncestor => "nested-descendant-to-ancestor",
      Boundary::CrossTopLevelSibling => "cross-top-level-sibling",
      Boundary::SiblingNestedUnderSharedParent => "sibling-nested-under-shared-parent",
    };
    f.write_str(name)
  }
}

/// The stacks a value passes through on its way from producer to consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
  pub boundary: Boundary,
  /// Nested stacks that publish the value as an output, innermost first.
  pub up: Vec<NodeId>,
  /// Top-level stacks `(producer side, consumer side)` joined by an export.
  pub export: Option<(NodeId, NodeId)>,
  /// Nested stacks that receive the value as a parameter, outermost first.
  pub down: Vec<NodeId>,
}

/// Classify the path between `producer` and `consumer` stacks.
///
/// The route follows the unique tree path between the two. Below top level
/// only output chains (upward) and parameter chains (downward) are used;
/// an export joins two different top-level stacks.
pub fn classify(tree: &Tree, producer: NodeId, consumer: NodeId) -> Result<Route, ResolveError> {
  if producer == consumer {
    return Ok(Route {
      boundary: Boundary::SameStack,
      up: Vec::new(),
      export: None,
      down: Vec::new(),
    });
  }

  let producer_chain = chain(tree, producer)?;
  let consumer_chain = chain(tree, consumer)?;
  let (Some(&producer_top), Some(&consumer_top)) = (producer_chain.last(), consumer_chain.last()) else {
    return Err(ResolveError::UnknownNode(producer));
  };

  if producer_top != consumer_top {
    let up = producer_chain[..producer_chain.len() - 1].to_vec();
    let mut down = consumer_chain[..consumer_chain.len() - 1].to_vec();
    down.reverse();
    return Ok(Route {
      boundary: Boundary::CrossTopLevelSibling,
      up,
      export: Some((producer_top, consumer_top)),
      down,
    });
  }

  // Both chains end at the same top-level stack, so a common stack exists.
  let common = producer_chain
    .iter()
    .position(|s| consumer_chain.contains(s))
    .ok_or(ResolveError::UnknownNode(producer))?;
  let shared = producer_chain[common];
  let up = producer_chain[..common].to_vec();
  let mut down: Vec<NodeId> = consumer_chain.iter().take_while(|s| **s != shared).copied().collect();
  down.reverse();

  let boundary = match (up.is_empty(), down.is_empty()) {
    (true, false) => Boundary::AncestorToNestedDescendant,
    (false, true) => Boundary::NestedDescendantToAncestor,
    _ => Boundary::SiblingNestedUnderSharedParent,
  };

  Ok(Route {
    boundary,
    up,
    export: None,
    down,
  })
}

fn chain(tree: &Tree, stack: NodeId) -> Result<Vec<NodeId>, ResolveError> {
  let chain = tree.stack_chain(stack);
  if chain.first() != Some(&stack) {
    return Err(ResolveError::NoEnclosingStack { path: tree.path(stack) });
  }
  Ok(chain)
}
