use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;

use crate::placeholder::Placeholder;

/// What the engine needs from a resource construct.
///
/// Resource-specific construct libraries implement this; the engine never
/// looks past it. Property values may be deferred.
pub trait ResourceConstruct: fmt::Debug {
  /// Deployment-engine resource type, e.g. `AWS::S3::Bucket`.
  fn resource_type(&self) -> &str;

  /// Properties in declaration order.
  fn properties(&self) -> &IndexMap<String, Placeholder>;

  /// Set a property, replacing any previous value under the same name.
  fn set_property(&mut self, name: String, value: Placeholder);

  /// Whether `attribute` can be read from this resource. `Ref` is always readable.
  fn has_attribute(&self, attribute: &str) -> bool;
}

/// A raw resource: a type name, a property bag, and an optional closed set
/// of readable attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnResource {
  resource_type: String,
  properties: IndexMap<String, Placeholder>,
  attributes: Option<BTreeSet<String>>,
}

impl CfnResource {
  pub fn new(resource_type: impl Into<String>) -> Self {
    Self {
      resource_type: resource_type.into(),
      properties: IndexMap::new(),
      attributes: None,
    }
  }

  pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Placeholder>) -> Self {
    self.properties.insert(name.into(), value.into());
    self
  }

  /// Restrict readable attributes to `attributes` (plus `Ref`). Without this
  /// any attribute name is accepted.
  pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.attributes = Some(attributes.into_iter().map(Into::into).collect());
    self
  }
}

impl ResourceConstruct for CfnResource {
  fn resource_type(&self) -> &str {
    &self.resource_type
  }

  fn properties(&self) -> &IndexMap<String, Placeholder> {
    &self.properties
  }

  fn set_property(&mut self, name: String, value: Placeholder) {
    self.properties.insert(name, value);
  }

  fn has_attribute(&self, attribute: &str) -> bool {
    attribute == "Ref"
      || self
        .attributes
        .as_ref()
        .is_none_or(|attributes| attributes.contains(attribute))
  }
}
