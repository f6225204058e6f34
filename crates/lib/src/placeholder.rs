//! Deferred values and their context-sensitive resolution.
//!
//! Constructs hold property values that may not be known until synthesis:
//! "the id of resource X", "the bucket this asset is uploaded to", "the
//! region of whichever stack ends up consuming this". A [`Placeholder`] is a
//! tree of such values. Leaves that point at another construct are
//! [`Leaf`]s; composites (`Join`, `Select`, ...) combine other placeholders.
//!
//! # Resolution
//!
//! Resolution is a pure function of `(value, consuming context)`. The same
//! placeholder resolves to `{"Ref": "Bucket"}` inside the bucket's own stack,
//! to `{"Ref": "referenceto...Ref"}` inside a nested stack below it, and to
//! `{"Fn::ImportValue": "..."}` inside an unrelated top-level stack. The
//! context is supplied by a [`Resolver`], which decides how each leaf is
//! rendered for the stack doing the consuming.
//!
//! # Discovery
//!
//! [`Placeholder::leaves`] is a structural scan: it enumerates every leaf
//! without needing a consuming context, which is what reference discovery
//! runs on.
//!
//! # Example
//!
//! ```
//! use stackweave_lib::placeholder::{Placeholder, Pseudo};
//!
//! let url = Placeholder::join("", vec![
//!   Placeholder::from("https://s3."),
//!   Placeholder::Pseudo(Pseudo::Region),
//!   Placeholder::from(".amazonaws.com"),
//! ]);
//! assert!(url.leaves().is_empty());
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::assets::AssetSlot;
use crate::construct::NodeId;
use crate::template::Primitive;
use crate::util::hash::ContentHash;

/// Deployment-engine pseudo parameters, available in every template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pseudo {
  AccountId,
  Region,
  Partition,
  StackId,
  StackName,
  UrlSuffix,
  NoValue,
}

impl Pseudo {
  pub fn name(self) -> &'static str {
    match self {
      Pseudo::AccountId => "AWS::AccountId",
      Pseudo::Region => "AWS::Region",
      Pseudo::Partition => "AWS::Partition",
      Pseudo::StackId => "AWS::StackId",
      Pseudo::StackName => "AWS::StackName",
      Pseudo::UrlSuffix => "AWS::URLSuffix",
      Pseudo::NoValue => "AWS::NoValue",
    }
  }

  /// Parse a pseudo parameter from its engine name (`AWS::Region`, ...).
  pub fn from_name(name: &str) -> Option<Self> {
    let pseudo = match name {
      "AWS::AccountId" => Pseudo::AccountId,
      "AWS::Region" => Pseudo::Region,
      "AWS::Partition" => Pseudo::Partition,
      "AWS::StackId" => Pseudo::StackId,
      "AWS::StackName" => Pseudo::StackName,
      "AWS::URLSuffix" => Pseudo::UrlSuffix,
      "AWS::NoValue" => Pseudo::NoValue,
      _ => return None,
    };
    Some(pseudo)
  }
}

/// Where an attribute value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
  /// A resource or parameter construct in the tree.
  Construct(NodeId),

  /// One parameter of an asset's parameter set, declared on a top-level stack.
  AssetParameter {
    stack: NodeId,
    hash: ContentHash,
    slot: AssetSlot,
  },
}

/// An attribute of a value-producing construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeRef {
  pub source: Source,
  /// `Ref` for the primary identifier, otherwise a named attribute.
  pub attribute: String,
}

/// Identity attributes every stack exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StackAttribute {
  Id,
  Name,
}

/// A stack's own id or name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackAttributeRef {
  pub stack: NodeId,
  pub attribute: StackAttribute,
}

/// A deferred value.
#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
  Literal(Value),
  Attribute(AttributeRef),
  Pseudo(Pseudo),
  StackAttribute(StackAttributeRef),
  Join { separator: String, parts: Vec<Placeholder> },
  Select { index: usize, list: Box<Placeholder> },
  Split { separator: String, source: Box<Placeholder> },
  List(Vec<Placeholder>),
  Object(IndexMap<String, Placeholder>),
}

/// A placeholder leaf that may live in a different stack than its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Leaf {
  Attribute(AttributeRef),
  Stack(StackAttributeRef),
}

impl fmt::Display for Leaf {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Leaf::Attribute(AttributeRef {
        source: Source::Construct(node),
        attribute,
      }) => write!(f, "{node}.{attribute}"),
      Leaf::Attribute(AttributeRef {
        source: Source::AssetParameter { hash, slot, .. },
        ..
      }) => write!(f, "asset:{hash}.{}", slot.name()),
      Leaf::Stack(StackAttributeRef { stack, attribute }) => write!(f, "{stack}.{attribute:?}"),
    }
  }
}

/// Errors that can occur while resolving a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  #[error("unknown construct {0}")]
  UnknownNode(NodeId),

  #[error("construct '{path}' has no enclosing stack")]
  NoEnclosingStack { path: String },

  #[error("construct '{path}' does not produce values")]
  NotAProducer { path: String },

  #[error("value {leaf} is not wired into stack '{consumer}'")]
  Unwired { leaf: String, consumer: String },

  #[error("cannot render {value} for export: {message}")]
  Render { value: String, message: String },
}

/// Renders leaves for one consuming context.
pub trait Resolver {
  /// Render a leaf as seen from the consuming stack.
  fn resolve_leaf(&self, leaf: &Leaf) -> Result<Primitive, ResolveError>;
}

impl Placeholder {
  pub fn literal(value: impl Into<Value>) -> Self {
    Placeholder::Literal(value.into())
  }

  /// The primary identifier (`Ref`) of a construct.
  pub fn reference(node: NodeId) -> Self {
    Self::attribute(node, "Ref")
  }

  /// A named attribute of a construct. Not validated; use
  /// [`App::get_att`](crate::app::App::get_att) for checked access.
  pub fn attribute(node: NodeId, attribute: impl Into<String>) -> Self {
    Placeholder::Attribute(AttributeRef {
      source: Source::Construct(node),
      attribute: attribute.into(),
    })
  }

  pub fn stack_id(stack: NodeId) -> Self {
    Placeholder::StackAttribute(StackAttributeRef {
      stack,
      attribute: StackAttribute::Id,
    })
  }

  pub fn stack_name(stack: NodeId) -> Self {
    Placeholder::StackAttribute(StackAttributeRef {
      stack,
      attribute: StackAttribute::Name,
    })
  }

  pub fn join(separator: impl Into<String>, parts: Vec<Placeholder>) -> Self {
    Placeholder::Join {
      separator: separator.into(),
      parts,
    }
  }

  pub fn select(index: usize, list: Placeholder) -> Self {
    Placeholder::Select {
      index,
      list: Box::new(list),
    }
  }

  pub fn split(separator: impl Into<String>, source: Placeholder) -> Self {
    Placeholder::Split {
      separator: separator.into(),
      source: Box::new(source),
    }
  }

  /// Every leaf in this value, in depth-first declaration order.
  ///
  /// Duplicates are kept; discovery decides what to do with them.
  pub fn leaves(&self) -> Vec<Leaf> {
    let mut leaves = Vec::new();
    self.collect_leaves(&mut leaves);
    leaves
  }

  fn collect_leaves(&self, leaves: &mut Vec<Leaf>) {
    match self {
      Placeholder::Attribute(attr) => leaves.push(Leaf::Attribute(attr.clone())),
      Placeholder::StackAttribute(attr) => leaves.push(Leaf::Stack(attr.clone())),
      Placeholder::Join { parts, .. } | Placeholder::List(parts) => {
        for part in parts {
          part.collect_leaves(leaves);
        }
      }
      Placeholder::Select { list, .. } => list.collect_leaves(leaves),
      Placeholder::Split { source, .. } => source.collect_leaves(leaves),
      Placeholder::Object(fields) => {
        for value in fields.values() {
          value.collect_leaves(leaves);
        }
      }
      Placeholder::Literal(_) | Placeholder::Pseudo(_) => {}
    }
  }

  /// Resolve this value for the context represented by `resolver`.
  pub fn resolve(&self, resolver: &impl Resolver) -> Result<Primitive, ResolveError> {
    match self {
      Placeholder::Literal(value) => Ok(Primitive::Literal(value.clone())),
      Placeholder::Pseudo(pseudo) => Ok(Primitive::Ref(pseudo.name().to_string())),
      Placeholder::Attribute(attr) => resolver.resolve_leaf(&Leaf::Attribute(attr.clone())),
      Placeholder::StackAttribute(attr) => resolver.resolve_leaf(&Leaf::Stack(attr.clone())),
      Placeholder::Join { separator, parts } => Ok(Primitive::Join {
        separator: separator.clone(),
        parts: resolve_all(parts, resolver)?,
      }),
      Placeholder::Select { index, list } => Ok(Primitive::Select {
        index: *index,
        list: Box::new(list.resolve(resolver)?),
      }),
      Placeholder::Split { separator, source } => Ok(Primitive::Split {
        separator: separator.clone(),
        source: Box::new(source.resolve(resolver)?),
      }),
      Placeholder::List(items) => Ok(Primitive::List(resolve_all(items, resolver)?)),
      Placeholder::Object(fields) => {
        let mut resolved = IndexMap::with_capacity(fields.len());
        for (key, value) in fields {
          resolved.insert(key.clone(), value.resolve(resolver)?);
        }
        Ok(Primitive::Object(resolved))
      }
    }
  }
}

fn resolve_all(values: &[Placeholder], resolver: &impl Resolver) -> Result<Vec<Primitive>, ResolveError> {
  values.iter().map(|v| v.resolve(resolver)).collect()
}

impl From<&str> for Placeholder {
  fn from(value: &str) -> Self {
    Placeholder::Literal(Value::String(value.to_string()))
  }
}

impl From<String> for Placeholder {
  fn from(value: String) -> Self {
    Placeholder::Literal(Value::String(value))
  }
}

impl From<i64> for Placeholder {
  fn from(value: i64) -> Self {
    Placeholder::Literal(Value::from(value))
  }
}

impl From<bool> for Placeholder {
  fn from(value: bool) -> Self {
    Placeholder::Literal(Value::Bool(value))
  }
}

impl From<Pseudo> for Placeholder {
  fn from(value: Pseudo) -> Self {
    Placeholder::Pseudo(value)
  }
}
