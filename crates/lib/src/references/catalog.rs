use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::assets::{AssetSlot, Packaging, slot_value};
use crate::construct::{NodeId, NodeKind, Tree};
use crate::placeholder::{Leaf, Placeholder, ResolveError};

use super::producer::{Producer, describe};

/// A value consumed in a different stack from the one that produces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
  pub leaf: Leaf,
  pub producer: Producer,
  pub consumer_node: NodeId,
  pub consumer_stack: NodeId,
}

impl Reference {
  /// Build a reference for a value consumed in `consumer_stack`, or `None`
  /// when the value is native there.
  pub fn between(
    tree: &Tree,
    leaf: &Leaf,
    consumer_node: NodeId,
    consumer_stack: NodeId,
  ) -> Result<Option<Reference>, ResolveError> {
    // A stack's own identity is always available to it.
    if let Leaf::Stack(attr) = leaf
      && attr.stack == consumer_stack
    {
      return Ok(None);
    }
    let producer = describe(tree, leaf)?;
    if producer.home == consumer_stack {
      return Ok(None);
    }
    Ok(Some(Reference {
      leaf: leaf.clone(),
      producer,
      consumer_node,
      consumer_stack,
    }))
  }
}

/// Every deferred property held by `node`, in declaration order.
fn properties_of(tree: &Tree, node: NodeId) -> Vec<(&str, &Placeholder)> {
  match tree.get(node).map(|n| n.kind()) {
    Some(NodeKind::Resource(resource)) => resource.properties().iter().map(|(k, v)| (k.as_str(), v)).collect(),
    Some(NodeKind::Output(output)) => vec![("Value", &output.value)],
    _ => Vec::new(),
  }
}

/// Leaves consumed by `node`, paired with the property that holds them.
///
/// A container image declared in a nested stack consumes its image name
/// parameter even when nothing reads it, so the nested template always
/// receives that parameter.
fn consumed_by(tree: &Tree, node: NodeId) -> Vec<(&str, Leaf)> {
  if let Some(NodeKind::Asset(asset)) = tree.get(node).map(|n| n.kind()) {
    if asset.packaging != Packaging::ContainerImage || !tree.stack_of(node).is_some_and(|s| tree.is_nested(s)) {
      return Vec::new();
    }
    let Some(top) = tree.top_level_of(node) else {
      return Vec::new();
    };
    return slot_value(top, &asset.hash, AssetSlot::ImageName)
      .leaves()
      .into_iter()
      .map(|leaf| ("ImageName", leaf))
      .collect();
  }
  properties_of(tree, node)
    .into_iter()
    .flat_map(|(property, value)| value.leaves().into_iter().map(move |leaf| (property, leaf)))
    .collect()
}

/// Discover every cross-stack reference in the tree.
///
/// Nodes are visited in pre-order and properties in declaration order, so
/// the result is stable for a given tree. A leaf consumed several times by
/// the same construct yields a single reference.
pub fn discover(tree: &Tree) -> Result<Vec<Reference>, ResolveError> {
  let mut references = Vec::new();
  let mut seen: BTreeSet<(Leaf, NodeId)> = BTreeSet::new();

  for node in tree.preorder() {
    let consumed = consumed_by(tree, node);
    if consumed.is_empty() {
      continue;
    }
    let consumer_stack = tree
      .stack_of(node)
      .ok_or_else(|| ResolveError::NoEnclosingStack { path: tree.path(node) })?;

    for (property, leaf) in consumed {
      if seen.contains(&(leaf.clone(), node)) {
        continue;
      }
      if let Some(reference) = Reference::between(tree, &leaf, node, consumer_stack)? {
        trace!(
          consumer = %tree.path(node),
          property,
          producer = %reference.producer.path.join("/"),
          attribute = %reference.producer.attribute,
          "found cross-stack reference"
        );
        seen.insert((leaf, node));
        references.push(reference);
      }
    }
  }

  debug!(references = references.len(), "discovered references");
  Ok(references)
}
