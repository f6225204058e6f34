//! Template documents and the low-level primitive vocabulary.
//!
//! A [`Primitive`] is what a deferred value becomes once it has been resolved
//! for a particular consuming stack. Primitives serialize to the intrinsic
//! function syntax of the deployment engine:
//!
//! | Primitive            | JSON form                                        |
//! |----------------------|--------------------------------------------------|
//! | `Literal`            | the literal value                                |
//! | `Ref`                | `{"Ref": name}`                                  |
//! | `GetAtt`             | `{"Fn::GetAtt": [logicalId, attribute]}`         |
//! | `ImportValue`        | `{"Fn::ImportValue": exportName}`                |
//! | `Join`               | `{"Fn::Join": [separator, [parts...]]}`          |
//! | `Select`             | `{"Fn::Select": [index, list]}`                  |
//! | `Split`              | `{"Fn::Split": [separator, source]}`             |
//!
//! A nested attribute lookup through a deployable-stack resource is a
//! `GetAtt` whose attribute is `Outputs.<outputName>`; its display form is
//! `<resourceLogicalId>.Outputs.<outputName>`.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A resolved, context-specific value ready to be written into a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
  Literal(Value),
  Ref(String),
  GetAtt { logical_id: String, attribute: String },
  ImportValue(String),
  Join { separator: String, parts: Vec<Primitive> },
  Select { index: usize, list: Box<Primitive> },
  Split { separator: String, source: Box<Primitive> },
  List(Vec<Primitive>),
  Object(IndexMap<String, Primitive>),
}

impl Primitive {
  pub fn reference(name: impl Into<String>) -> Self {
    Primitive::Ref(name.into())
  }

  pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
    Primitive::GetAtt {
      logical_id: logical_id.into(),
      attribute: attribute.into(),
    }
  }

  /// Attribute lookup of `output` through the deployable-stack resource `resource_id`.
  pub fn nested_output(resource_id: impl Into<String>, output: &str) -> Self {
    Primitive::GetAtt {
      logical_id: resource_id.into(),
      attribute: format!("Outputs.{output}"),
    }
  }

  /// Compact JSON rendering, used to derive export names.
  pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

impl fmt::Display for Primitive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Primitive::Ref(name) => write!(f, "{name}"),
      Primitive::GetAtt { logical_id, attribute } => write!(f, "{logical_id}.{attribute}"),
      Primitive::ImportValue(name) => write!(f, "import:{name}"),
      other => f.write_str(&other.to_json_string().map_err(|_| fmt::Error)?),
    }
  }
}

impl Serialize for Primitive {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Primitive::Literal(value) => value.serialize(serializer),
      Primitive::Ref(name) => single_key(serializer, "Ref", name),
      Primitive::GetAtt { logical_id, attribute } => single_key(serializer, "Fn::GetAtt", &[logical_id, attribute]),
      Primitive::ImportValue(name) => single_key(serializer, "Fn::ImportValue", name),
      Primitive::Join { separator, parts } => single_key(serializer, "Fn::Join", &(separator, parts)),
      Primitive::Select { index, list } => single_key(serializer, "Fn::Select", &(index, list)),
      Primitive::Split { separator, source } => single_key(serializer, "Fn::Split", &(separator, source)),
      Primitive::List(items) => {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
          seq.serialize_element(item)?;
        }
        seq.end()
      }
      Primitive::Object(fields) => fields.serialize(serializer),
    }
  }
}

fn single_key<S: Serializer, T: Serialize + ?Sized>(serializer: S, key: &str, value: &T) -> Result<S::Ok, S::Error> {
  let mut map = serializer.serialize_map(Some(1))?;
  map.serialize_entry(key, value)?;
  map.end()
}

/// A parameter declaration in a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDef {
  #[serde(rename = "Type")]
  pub param_type: String,

  #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
  pub default: Option<Value>,

  #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl ParameterDef {
  /// A plain string parameter, as used for values wired into nested stacks.
  pub fn string() -> Self {
    Self {
      param_type: "String".to_string(),
      default: None,
      description: None,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }
}

/// The export block nested under an output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDef {
  #[serde(rename = "Name")]
  pub name: String,
}

/// An output declaration in a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDef {
  #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  #[serde(rename = "Value")]
  pub value: Primitive,

  #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
  pub export: Option<ExportDef>,
}

/// A resource entry in a rendered template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDef {
  #[serde(rename = "Type")]
  pub resource_type: String,

  #[serde(rename = "Properties", skip_serializing_if = "IndexMap::is_empty")]
  pub properties: IndexMap<String, Primitive>,
}

/// A rendered template document.
///
/// Parameters and outputs are kept sorted by name; resources keep tree order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Template {
  #[serde(rename = "Parameters", skip_serializing_if = "BTreeMap::is_empty")]
  pub parameters: BTreeMap<String, ParameterDef>,

  #[serde(rename = "Resources", skip_serializing_if = "IndexMap::is_empty")]
  pub resources: IndexMap<String, ResourceDef>,

  #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
  pub outputs: BTreeMap<String, OutputDef>,
}

impl Template {
  /// Serialize to canonical JSON bytes.
  pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
      serde_json::to_string_pretty(self)
    } else {
      serde_json::to_string(self)
    }
  }

  /// Every export name declared by this template.
  pub fn export_names(&self) -> Vec<&str> {
    self
      .outputs
      .values()
      .filter_map(|o| o.export.as_ref().map(|e| e.name.as_str()))
      .collect()
  }
}
