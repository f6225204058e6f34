use crate::construct::{NodeId, NodeKind, Tree};
use crate::consts::ASSET_PARAMETERS_SCOPE;
use crate::naming::asset_parameter_id;
use crate::placeholder::{AttributeRef, Leaf, Pseudo, ResolveError, Source, StackAttribute, StackAttributeRef};
use crate::template::Primitive;

/// Everything wiring needs to know about where a leaf's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct Producer {
  /// The stack in which the value exists natively.
  pub home: NodeId,
  /// Structural identity of the value: producer path plus attribute.
  pub path: Vec<String>,
  pub attribute: String,
  /// How the value is written inside its home stack.
  pub native: Primitive,
}

/// Describe the producer of `leaf`.
pub fn describe(tree: &Tree, leaf: &Leaf) -> Result<Producer, ResolveError> {
  match leaf {
    Leaf::Attribute(AttributeRef {
      source: Source::Construct(node),
      attribute,
    }) => construct_producer(tree, *node, attribute),
    Leaf::Attribute(AttributeRef {
      source: Source::AssetParameter { stack, hash, slot },
      ..
    }) => {
      let name = asset_parameter_id(&hash.0, slot.name());
      let mut path = tree.path_components(*stack);
      path.extend([ASSET_PARAMETERS_SCOPE.to_string(), hash.0.clone(), slot.name().to_string()]);
      Ok(Producer {
        home: *stack,
        path,
        attribute: "Ref".to_string(),
        native: Primitive::reference(name),
      })
    }
    Leaf::Stack(StackAttributeRef { stack, attribute }) => stack_producer(tree, *stack, *attribute),
  }
}

fn construct_producer(tree: &Tree, node: NodeId, attribute: &str) -> Result<Producer, ResolveError> {
  let n = tree.get(node).ok_or(ResolveError::UnknownNode(node))?;
  let home = tree.stack_of(node).ok_or_else(|| ResolveError::NoEnclosingStack { path: tree.path(node) })?;
  let logical_id = tree
    .logical_id(node)
    .map_err(|_| ResolveError::NoEnclosingStack { path: tree.path(node) })?;

  let native = match (n.kind(), attribute) {
    (NodeKind::Resource(_) | NodeKind::Parameter(_), "Ref") => Primitive::reference(logical_id),
    (NodeKind::Resource(_), attribute) => Primitive::get_att(logical_id, attribute),
    _ => return Err(ResolveError::NotAProducer { path: tree.path(node) }),
  };

  Ok(Producer {
    home,
    path: tree.path_components(node),
    attribute: attribute.to_string(),
    native,
  })
}

/// A nested stack's identity is visible natively in its parent, through the
/// deployable-stack resource. A top-level stack's is only visible to itself.
fn stack_producer(tree: &Tree, stack: NodeId, attribute: StackAttribute) -> Result<Producer, ResolveError> {
  let node = tree.get(stack).ok_or(ResolveError::UnknownNode(stack))?;
  if !node.is_stack() {
    return Err(ResolveError::NotAProducer { path: tree.path(stack) });
  }
  let attribute_name = match attribute {
    StackAttribute::Id => "StackId",
    StackAttribute::Name => "StackName",
  };

  if !node.is_nested_stack() {
    let pseudo = match attribute {
      StackAttribute::Id => Pseudo::StackId,
      StackAttribute::Name => Pseudo::StackName,
    };
    return Ok(Producer {
      home: stack,
      path: tree.path_components(stack),
      attribute: attribute_name.to_string(),
      native: Primitive::reference(pseudo.name()),
    });
  }

  let home = tree
    .parent_stack(stack)
    .ok_or_else(|| ResolveError::NoEnclosingStack { path: tree.path(stack) })?;
  let resource_id = tree
    .nested_stack_resource_id(stack)
    .map_err(|_| ResolveError::NoEnclosingStack { path: tree.path(stack) })?;
  let path = tree
    .nested_stack_resource_path(stack)
    .map_err(|_| ResolveError::UnknownNode(stack))?;

  let stack_ref = Primitive::reference(resource_id);
  let native = match attribute {
    StackAttribute::Id => stack_ref,
    // The deployable-stack resource's Ref is the stack ARN:
    // arn:<partition>:cloudformation:<region>:<account>:stack/<name>/<uuid>
    StackAttribute::Name => Primitive::Select {
      index: 1,
      list: Box::new(Primitive::Split {
        separator: "/".to_string(),
        source: Box::new(stack_ref),
      }),
    },
  };

  Ok(Producer {
    home,
    path,
    attribute: attribute_name.to_string(),
    native,
  })
}
