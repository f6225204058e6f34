//! Serialized form of an application definition.

use std::collections::BTreeMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::construct::Environment;

/// A whole application: constructs listed parents first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppDefinition {
  #[serde(default)]
  pub constructs: Vec<ConstructDef>,
}

/// One construct, addressed by its `/`-separated path from the root.
///
/// Property and output values are JSON with embedded reference expressions;
/// see the expression table in the [`definition`](super) module docs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConstructDef {
  Group {
    path: String,
  },

  Stack {
    path: String,
    #[serde(default, rename = "stackName", skip_serializing_if = "Option::is_none")]
    stack_name: Option<String>,
    #[serde(default)]
    env: Environment,
  },

  NestedStack {
    path: String,
  },

  Resource {
    path: String,
    #[serde(rename = "type")]
    resource_type: String,
    /// Attributes `Fn::GetAtt` may read. Unchecked when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<Vec<String>>,
    #[serde(default)]
    properties: IndexMap<String, Value>,
  },

  Parameter {
    path: String,
    #[serde(rename = "type", default = "default_parameter_type")]
    parameter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
  },

  Output {
    path: String,
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, rename = "exportName", skip_serializing_if = "Option::is_none")]
    export_name: Option<String>,
  },

  FileAsset {
    path: String,
    /// File or directory, relative to the definition file.
    source: PathBuf,
    #[serde(default)]
    exclude: Vec<String>,
  },

  ImageAsset {
    path: String,
    /// Build context, relative to the definition file.
    directory: PathBuf,
    #[serde(default, rename = "buildArgs")]
    build_args: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, rename = "repositoryName", skip_serializing_if = "Option::is_none")]
    repository_name: Option<String>,
  },
}

fn default_parameter_type() -> String {
  "String".to_string()
}

impl ConstructDef {
  pub fn path(&self) -> &str {
    match self {
      ConstructDef::Group { path }
      | ConstructDef::Stack { path, .. }
      | ConstructDef::NestedStack { path }
      | ConstructDef::Resource { path, .. }
      | ConstructDef::Parameter { path, .. }
      | ConstructDef::Output { path, .. }
      | ConstructDef::FileAsset { path, .. }
      | ConstructDef::ImageAsset { path, .. } => path,
    }
  }
}
