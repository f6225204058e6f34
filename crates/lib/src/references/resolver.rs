use crate::construct::{NodeId, Tree};
use crate::placeholder::{Leaf, Pseudo, ResolveError, Resolver, StackAttribute};
use crate::template::Primitive;

use super::producer::describe;
use super::wiring::WiringTable;

/// Resolves leaves as seen from one consuming stack, after wiring.
#[derive(Debug, Clone, Copy)]
pub struct StackResolver<'a> {
  tree: &'a Tree,
  table: &'a WiringTable,
  consumer: NodeId,
}

impl<'a> StackResolver<'a> {
  pub fn new(tree: &'a Tree, table: &'a WiringTable, consumer: NodeId) -> Self {
    Self { tree, table, consumer }
  }
}

impl Resolver for StackResolver<'_> {
  fn resolve_leaf(&self, leaf: &Leaf) -> Result<Primitive, ResolveError> {
    if let Leaf::Stack(attr) = leaf
      && attr.stack == self.consumer
    {
      let pseudo = match attr.attribute {
        StackAttribute::Id => Pseudo::StackId,
        StackAttribute::Name => Pseudo::StackName,
      };
      return Ok(Primitive::reference(pseudo.name()));
    }

    let producer = describe(self.tree, leaf)?;
    if producer.home == self.consumer {
      return Ok(producer.native);
    }

    self
      .table
      .get(&(leaf.clone(), self.consumer))
      .cloned()
      .ok_or_else(|| ResolveError::Unwired {
        leaf: leaf.to_string(),
        consumer: self.tree.path(self.consumer),
      })
  }
}
