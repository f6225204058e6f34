//! Application definitions loaded from JSON.
//!
//! A definition lists constructs by path, parents before children:
//!
//! ```json
//! {
//!   "constructs": [
//!     { "kind": "stack", "path": "Parent", "env": { "region": "us-east-1" } },
//!     { "kind": "resource", "path": "Parent/Bucket", "type": "AWS::S3::Bucket" },
//!     { "kind": "nested-stack", "path": "Parent/Nested" },
//!     {
//!       "kind": "resource",
//!       "path": "Parent/Nested/Reader",
//!       "type": "Custom::Reader",
//!       "properties": { "Bucket": { "Ref": "Parent/Bucket" } }
//!     }
//!   ]
//! }
//! ```
//!
//! Property and output values are plain JSON except for single-key objects
//! naming an intrinsic:
//!
//! | Expression                                   | Value                          |
//! |----------------------------------------------|--------------------------------|
//! | `{"Ref": "path"}`                            | primary id of a resource/parameter |
//! | `{"Ref": "AWS::Region"}`                     | pseudo parameter               |
//! | `{"Fn::GetAtt": ["path", "Attr"]}`           | resource attribute             |
//! | `{"Fn::Join": ["sep", [..]]}`                | join                           |
//! | `{"Fn::Select": [i, list]}`                  | select                         |
//! | `{"Fn::Split": ["sep", value]}`              | split                          |
//! | `{"Pseudo": "AWS::AccountId"}`               | pseudo parameter               |
//! | `{"StackId": "path"}`, `{"StackName": "path"}` | stack identity               |
//! | `{"Asset": "path", "Attribute": "url"}`      | asset location                 |
//!
//! Reference expressions may name constructs declared later in the file.

mod expr;
mod types;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::app::App;
use crate::assets::{AssetSource, ImageSource};
use crate::construct::{CfnResource, NodeId, OutputSpec, StackProps, TreeError};
use crate::template::ParameterDef;

use expr::ExpressionParser;
pub use types::*;

#[derive(Debug, Error)]
pub enum DefinitionError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse definition {origin}: {source}")]
  Parse {
    origin: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid construct path '{path}': {reason}")]
  InvalidPath { path: String, reason: String },

  #[error("unknown construct '{path}' referenced from '{at}'")]
  UnknownPath { path: String, at: String },

  #[error("invalid expression in '{at}': {reason}")]
  InvalidExpression { at: String, reason: String },

  #[error(transparent)]
  Tree(#[from] TreeError),
}

impl AppDefinition {
  pub fn from_file(path: &Path) -> Result<Self, DefinitionError> {
    let contents = fs::read_to_string(path).map_err(|source| DefinitionError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&contents, &path.display().to_string())
  }

  pub fn from_json(contents: &str) -> Result<Self, DefinitionError> {
    Self::parse(contents, "<inline>")
  }

  fn parse(contents: &str, origin: &str) -> Result<Self, DefinitionError> {
    serde_json::from_str(contents).map_err(|source| DefinitionError::Parse {
      origin: origin.to_string(),
      source,
    })
  }

  /// Build the construct tree. Asset sources resolve against `base_dir`.
  ///
  /// Constructs are created in file order. Values are attached in a second
  /// pass, once every construct exists, so references may point forward.
  pub fn build(&self, base_dir: &Path) -> Result<App, DefinitionError> {
    let mut app = App::new();
    let mut paths = BTreeMap::new();
    paths.insert(String::new(), app.root());

    for def in &self.constructs {
      if let ConstructDef::Output { path, .. } = def {
        // outputs only need a valid scope in the first pass
        scope_of(&paths, path)?;
        continue;
      }
      let node = create(&mut app, &paths, def, base_dir)?;
      paths.insert(def.path().to_string(), node);
    }

    for def in &self.constructs {
      match def {
        ConstructDef::Resource { path, properties, .. } => {
          let node = paths.get(path.as_str()).copied().ok_or_else(|| DefinitionError::UnknownPath {
            path: path.clone(),
            at: path.clone(),
          })?;
          let parser = ExpressionParser {
            app: &app,
            paths: &paths,
            at: path,
          };
          let values = properties
            .iter()
            .map(|(name, value)| Ok((name.clone(), parser.parse(value)?)))
            .collect::<Result<Vec<_>, DefinitionError>>()?;
          for (name, value) in values {
            app.set_property(node, &name, value)?;
          }
        }
        ConstructDef::Output {
          path,
          value,
          description,
          export_name,
        } => {
          let (scope, id) = scope_of(&paths, path)?;
          let parser = ExpressionParser {
            app: &app,
            paths: &paths,
            at: path,
          };
          let output = OutputSpec {
            value: parser.parse(value)?,
            description: description.clone(),
            export_name: export_name.clone(),
          };
          let node = app.add_output(scope, id, output)?;
          paths.insert(path.clone(), node);
        }
        _ => {}
      }
    }

    info!(constructs = self.constructs.len(), "built application from definition");
    Ok(app)
  }
}

/// Load a definition file and build it, resolving assets next to the file.
pub fn load_app(path: &Path) -> Result<App, DefinitionError> {
  let definition = AppDefinition::from_file(path)?;
  let base_dir = path.parent().unwrap_or(Path::new("."));
  definition.build(base_dir)
}

fn create(
  app: &mut App,
  paths: &BTreeMap<String, NodeId>,
  def: &ConstructDef,
  base_dir: &Path,
) -> Result<NodeId, DefinitionError> {
  let (scope, id) = scope_of(paths, def.path())?;
  debug!(path = %def.path(), "creating construct");

  let node = match def {
    ConstructDef::Group { .. } => app.add_group(scope, id)?,
    ConstructDef::Stack { stack_name, env, .. } => app.add_stack(
      scope,
      id,
      StackProps {
        stack_name: stack_name.clone(),
        env: env.clone(),
      },
    )?,
    ConstructDef::NestedStack { .. } => app.add_nested_stack(scope, id)?,
    ConstructDef::Resource {
      resource_type,
      attributes,
      ..
    } => {
      let mut resource = CfnResource::new(resource_type.clone());
      if let Some(attributes) = attributes {
        resource = resource.with_attributes(attributes.iter().cloned());
      }
      app.add_resource(scope, id, resource)?
    }
    ConstructDef::Parameter {
      parameter_type,
      default,
      description,
      ..
    } => app.add_parameter(
      scope,
      id,
      ParameterDef {
        param_type: parameter_type.clone(),
        default: default.clone(),
        description: description.clone(),
      },
    )?,
    ConstructDef::FileAsset { source, exclude, .. } => {
      let path = base_dir.join(source);
      let source = if path.is_dir() {
        AssetSource::Directory {
          path,
          exclude: exclude.clone(),
        }
      } else {
        AssetSource::File(path)
      };
      app.add_file_asset(scope, id, source)?.node
    }
    ConstructDef::ImageAsset {
      directory,
      build_args,
      target,
      file,
      repository_name,
      ..
    } => {
      let image = ImageSource {
        directory: base_dir.join(directory),
        build_args: build_args.clone(),
        target: target.clone(),
        file: file.clone(),
        repository_name: repository_name.clone(),
      };
      app.add_image_asset(scope, id, image)?.node
    }
    ConstructDef::Output { path, .. } => {
      return Err(DefinitionError::InvalidPath {
        path: path.clone(),
        reason: "outputs are attached after every construct exists".to_string(),
      });
    }
  };
  Ok(node)
}

/// Split `a/b/c` into the node at `a/b` and the id `c`.
fn scope_of<'p>(paths: &BTreeMap<String, NodeId>, path: &'p str) -> Result<(NodeId, &'p str), DefinitionError> {
  let (parent, id) = path.rsplit_once('/').unwrap_or(("", path));
  if id.is_empty() {
    return Err(DefinitionError::InvalidPath {
      path: path.to_string(),
      reason: "empty construct id".to_string(),
    });
  }
  let scope = paths.get(parent).copied().ok_or_else(|| DefinitionError::InvalidPath {
    path: path.to_string(),
    reason: format!("parent '{parent}' is not declared before it"),
  })?;
  Ok((scope, id))
}
