use std::fmt;

use thiserror::Error;

use crate::assets::{AssetError, Packaging};
use crate::naming::unique_id;
use crate::placeholder::Placeholder;
use crate::template::ParameterDef;
use crate::util::hash::ContentHash;

use super::resource::ResourceConstruct;
use super::stack::{Environment, StackKind};

/// Handle to a node in a [`Tree`].
///
/// Handles are only minted by the tree itself, so a handle is always valid
/// for the application that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A user-declared output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
  pub value: Placeholder,
  pub description: Option<String>,
  /// Export the value under this name.
  pub export_name: Option<String>,
}

impl OutputSpec {
  pub fn new(value: impl Into<Placeholder>) -> Self {
    Self {
      value: value.into(),
      description: None,
      export_name: None,
    }
  }
}

/// A registered asset as it sits in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNode {
  pub hash: ContentHash,
  pub packaging: Packaging,
}

#[derive(Debug)]
pub enum NodeKind {
  Root,
  Group,
  Stack(StackKind),
  Resource(Box<dyn ResourceConstruct>),
  Parameter(ParameterDef),
  Output(OutputSpec),
  Asset(AssetNode),
}

impl NodeKind {
  pub fn describe(&self) -> &'static str {
    match self {
      NodeKind::Root => "root",
      NodeKind::Group => "group",
      NodeKind::Stack(StackKind::TopLevel(_)) => "stack",
      NodeKind::Stack(StackKind::Nested) => "nested stack",
      NodeKind::Resource(_) => "resource",
      NodeKind::Parameter(_) => "parameter",
      NodeKind::Output(_) => "output",
      NodeKind::Asset(_) => "asset",
    }
  }
}

#[derive(Debug)]
pub struct Node {
  id: String,
  parent: Option<NodeId>,
  children: Vec<NodeId>,
  kind: NodeKind,
}

impl Node {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  pub fn children(&self) -> &[NodeId] {
    &self.children
  }

  pub fn kind(&self) -> &NodeKind {
    &self.kind
  }

  pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
    &mut self.kind
  }

  pub fn is_stack(&self) -> bool {
    matches!(self.kind, NodeKind::Stack(_))
  }

  pub fn is_nested_stack(&self) -> bool {
    matches!(self.kind, NodeKind::Stack(StackKind::Nested))
  }
}

/// Structural violations detected while building the tree.
#[derive(Debug, Error)]
pub enum TreeError {
  #[error("invalid construct id '{id}': {reason}")]
  InvalidId { id: String, reason: &'static str },

  #[error("there is already a construct with id '{id}' in '{scope}'")]
  DuplicateId { scope: String, id: String },

  #[error("nested stack '{id}' cannot be defined at the application root")]
  NestedStackAtRoot { id: String },

  #[error("nested stack '{path}' must be defined within the scope of another stack")]
  NestedStackWithoutParent { path: String },

  #[error("stack '{path}' cannot be defined inside stack '{parent}'; use a nested stack")]
  StackInsideStack { path: String, parent: String },

  #[error("{kind} '{path}' must be defined within the scope of a stack")]
  NoEnclosingStack { kind: &'static str, path: String },

  #[error("'{path}' is a {kind}, not a {expected}")]
  WrongKind {
    path: String,
    kind: &'static str,
    expected: &'static str,
  },

  #[error("resource '{path}' has no attribute '{attribute}'")]
  UnknownAttribute { path: String, attribute: String },

  #[error("invalid stack name '{name}': must start with a letter and contain only letters, digits, and hyphens")]
  InvalidStackName { name: String },

  #[error("unknown construct {0}")]
  UnknownNode(NodeId),

  #[error(transparent)]
  Asset(#[from] AssetError),
}

/// Arena of construct nodes. `NodeId(0)` is the root.
#[derive(Debug)]
pub struct Tree {
  nodes: Vec<Node>,
}

impl Default for Tree {
  fn default() -> Self {
    Self::new()
  }
}

impl Tree {
  pub fn new() -> Self {
    Self {
      nodes: vec![Node {
        id: String::new(),
        parent: None,
        children: Vec::new(),
        kind: NodeKind::Root,
      }],
    }
  }

  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.len() == 1
  }

  pub fn get(&self, node: NodeId) -> Option<&Node> {
    self.nodes.get(node.0)
  }

  pub fn node(&self, node: NodeId) -> Result<&Node, TreeError> {
    self.get(node).ok_or(TreeError::UnknownNode(node))
  }

  pub(crate) fn node_mut(&mut self, node: NodeId) -> Result<&mut Node, TreeError> {
    self.nodes.get_mut(node.0).ok_or(TreeError::UnknownNode(node))
  }

  /// Attach a new node under `parent`. Only id rules are checked here;
  /// placement rules belong to the caller.
  pub(crate) fn add_child(&mut self, parent: NodeId, id: &str, kind: NodeKind) -> Result<NodeId, TreeError> {
    if id.is_empty() {
      return Err(TreeError::InvalidId {
        id: id.to_string(),
        reason: "ids cannot be empty",
      });
    }
    if id.contains('/') {
      return Err(TreeError::InvalidId {
        id: id.to_string(),
        reason: "ids cannot contain '/'",
      });
    }

    let scope = self.node(parent)?;
    if scope.children.iter().any(|c| self.nodes[c.0].id == id) {
      return Err(TreeError::DuplicateId {
        scope: self.path(parent),
        id: id.to_string(),
      });
    }

    let node = NodeId(self.nodes.len());
    self.nodes.push(Node {
      id: id.to_string(),
      parent: Some(parent),
      children: Vec::new(),
      kind,
    });
    self.nodes[parent.0].children.push(node);
    Ok(node)
  }

  /// `node` and its ancestors, innermost first, excluding the root.
  pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(node), |n| self.get(*n).and_then(|n| n.parent)).filter(|n| n.0 != 0)
  }

  /// Path components from the root down to `node`.
  pub fn path_components(&self, node: NodeId) -> Vec<String> {
    let mut components: Vec<String> = self.ancestors(node).filter_map(|n| self.get(n)).map(|n| n.id.clone()).collect();
    components.reverse();
    components
  }

  /// `/`-separated construct path. Empty for the root.
  pub fn path(&self, node: NodeId) -> String {
    self.path_components(node).join("/")
  }

  pub fn unique_id(&self, node: NodeId) -> String {
    unique_id(&self.path_components(node))
  }

  /// Path components strictly below `ancestor` down to `node` inclusive.
  fn components_below(&self, ancestor: NodeId, node: NodeId) -> Vec<String> {
    let mut components: Vec<String> = self
      .ancestors(node)
      .take_while(|n| *n != ancestor)
      .filter_map(|n| self.get(n))
      .map(|n| n.id.clone())
      .collect();
    components.reverse();
    components
  }

  pub fn is_stack(&self, node: NodeId) -> bool {
    self.get(node).is_some_and(Node::is_stack)
  }

  pub fn is_nested(&self, node: NodeId) -> bool {
    self.get(node).is_some_and(Node::is_nested_stack)
  }

  /// The stack a node belongs to: the node itself for stacks, otherwise the
  /// nearest stack ancestor.
  pub fn stack_of(&self, node: NodeId) -> Option<NodeId> {
    self.ancestors(node).find(|n| self.is_stack(*n))
  }

  /// The nearest stack strictly above `node`.
  pub fn parent_stack(&self, node: NodeId) -> Option<NodeId> {
    self.ancestors(node).skip(1).find(|n| self.is_stack(*n))
  }

  pub fn top_level_of(&self, node: NodeId) -> Option<NodeId> {
    self.ancestors(node).filter(|n| self.is_stack(*n)).last()
  }

  /// Stacks from `node`'s stack up to its top-level stack, innermost first.
  pub fn stack_chain(&self, node: NodeId) -> Vec<NodeId> {
    self.ancestors(node).filter(|n| self.is_stack(*n)).collect()
  }

  /// Logical id of a member of a stack: the unique id of its path relative
  /// to the enclosing stack.
  pub fn logical_id(&self, node: NodeId) -> Result<String, TreeError> {
    let stack = self.parent_stack(node).ok_or_else(|| TreeError::NoEnclosingStack {
      kind: self.get(node).map_or("construct", |n| n.kind.describe()),
      path: self.path(node),
    })?;
    Ok(unique_id(&self.components_below(stack, node)))
  }

  /// Full path of the deployable-stack resource that embeds `nested` in its parent.
  pub fn nested_stack_resource_path(&self, nested: NodeId) -> Result<Vec<String>, TreeError> {
    let node = self.node(nested)?;
    let scope = node.parent.ok_or(TreeError::UnknownNode(nested))?;
    let mut components = self.path_components(scope);
    components.extend(nested_resource_components(&node.id));
    Ok(components)
  }

  /// Logical id of the deployable-stack resource that embeds `nested`,
  /// relative to its parent stack.
  pub fn nested_stack_resource_id(&self, nested: NodeId) -> Result<String, TreeError> {
    let node = self.node(nested)?;
    let (Some(scope), Some(parent)) = (node.parent, self.parent_stack(nested)) else {
      return Err(TreeError::NestedStackWithoutParent { path: self.path(nested) });
    };
    let mut components = if scope == parent {
      Vec::new()
    } else {
      self.components_below(parent, scope)
    };
    components.extend(nested_resource_components(&node.id));
    Ok(unique_id(&components))
  }

  /// Every node in tree pre-order, starting at the root.
  pub fn preorder(&self) -> Vec<NodeId> {
    self.preorder_from(self.root(), |_| true)
  }

  /// Nodes whose stack is `stack`, in pre-order, plus the nested stacks
  /// directly below it (not descended into).
  pub fn members_of(&self, stack: NodeId) -> Vec<NodeId> {
    self
      .preorder_from(stack, |n| n == stack || !self.is_stack(n))
      .into_iter()
      .filter(|n| *n != stack)
      .collect()
  }

  fn preorder_from(&self, start: NodeId, descend: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut pending = vec![start];
    while let Some(node) = pending.pop() {
      order.push(node);
      if descend(node)
        && let Some(n) = self.get(node)
      {
        pending.extend(n.children.iter().rev());
      }
    }
    order
  }

  /// Every stack in pre-order.
  pub fn stacks(&self) -> Vec<NodeId> {
    self.preorder().into_iter().filter(|n| self.is_stack(*n)).collect()
  }

  pub fn top_level_stacks(&self) -> Vec<NodeId> {
    self
      .preorder()
      .into_iter()
      .filter(|n| self.is_stack(*n) && !self.is_nested(*n))
      .collect()
  }

  /// Environment of a stack. Nested stacks always report their top-level
  /// stack's environment.
  pub fn environment(&self, stack: NodeId) -> Result<Environment, TreeError> {
    let top = self.top_level_of(stack).ok_or_else(|| TreeError::WrongKind {
      path: self.path(stack),
      kind: self.get(stack).map_or("construct", |n| n.kind.describe()),
      expected: "stack",
    })?;
    match &self.node(top)?.kind {
      NodeKind::Stack(StackKind::TopLevel(props)) => Ok(props.env.clone()),
      _ => Err(TreeError::UnknownNode(top)),
    }
  }

  /// Deployed name of a stack.
  ///
  /// Top-level stacks use their configured name, their id when they sit
  /// directly under the root, or the unique id of their path otherwise.
  /// Nested stacks are named by the unique id of their path.
  pub fn stack_name(&self, stack: NodeId) -> String {
    match self.get(stack).map(|n| (&n.kind, n.parent)) {
      Some((NodeKind::Stack(StackKind::TopLevel(props)), parent)) => match &props.stack_name {
        Some(name) => name.clone(),
        None if parent == Some(self.root()) => self.nodes[stack.0].id.clone(),
        None => self.unique_id(stack),
      },
      _ => self.unique_id(stack),
    }
  }
}

fn nested_resource_components(id: &str) -> [String; 2] {
  [format!("{id}.NestedStack"), format!("{id}.NestedStackResource")]
}
