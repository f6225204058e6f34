//! Synthesis: from a built application to deployable documents.
//!
//! Synthesis runs in two phases over a frozen tree. [`prepare`] wires every
//! cross-stack reference and embeds nested stack templates as assets;
//! [`synthesize`] renders one template per top-level stack and assembles
//! the manifest. Any failure aborts the whole application.

mod prepare;
mod render;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::app::App;
use crate::assets::AssetError;
use crate::construct::TreeError;
use crate::consts::{MANIFEST_FILE, TEMPLATE_SUFFIX};
use crate::graph::GraphError;
use crate::manifest::{AssemblyManifest, AssetMetadata, StackArtifact};
use crate::placeholder::ResolveError;
use crate::template::Template;

pub use prepare::{NestedTemplate, Prepared, prepare};

#[derive(Debug, Error)]
pub enum SynthError {
  #[error(transparent)]
  Tree(#[from] TreeError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Asset(#[from] AssetError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(
    "stack '{consumer}' ({consumer_env}) cannot reference stack '{producer}' ({producer_env}): cross-environment references are not supported"
  )]
  CrossEnvironment {
    consumer: String,
    consumer_env: String,
    producer: String,
    producer_env: String,
  },

  #[error("two stacks are named '{0}'")]
  DuplicateStackName(String),

  #[error("duplicate {kind} logical id '{id}' in stack '{stack}'")]
  DuplicateLogicalId { stack: String, kind: String, id: String },

  #[error("internal consistency error: {0}")]
  Inconsistent(String),

  #[error("failed to serialize {what}: {source}")]
  Serialize {
    what: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to write {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// How a synthesized assembly is written out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthOptions {
  pub output_dir: PathBuf,
  /// Indent JSON documents.
  pub pretty: bool,
  /// Write `manifest.json` alongside the templates.
  pub manifest: bool,
}

impl Default for SynthOptions {
  fn default() -> Self {
    Self {
      output_dir: PathBuf::from("weave.out"),
      pretty: true,
      manifest: true,
    }
  }
}

/// Every document produced for an application, plus its manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAssembly {
  pub manifest: AssemblyManifest,
  /// Document file name to template. Includes nested stack templates.
  pub documents: BTreeMap<String, Template>,
}

impl CloudAssembly {
  pub fn document(&self, file: &str) -> Option<&Template> {
    self.documents.get(file)
  }

  /// Template of the top-level stack deployed under `stack_name`.
  pub fn stack_template(&self, stack_name: &str) -> Option<&Template> {
    let artifact = self.manifest.artifacts.get(stack_name)?;
    self.documents.get(&artifact.template_file)
  }

  /// Serialize every document to JSON.
  pub fn render(&self, pretty: bool) -> Result<BTreeMap<String, String>, SynthError> {
    self
      .documents
      .iter()
      .map(|(file, template)| {
        template
          .to_json(pretty)
          .map(|json| (file.clone(), json))
          .map_err(|source| SynthError::Serialize {
            what: file.clone(),
            source,
          })
      })
      .collect()
  }

  /// Write every document, and the manifest if requested, to
  /// `options.output_dir`. Returns the written paths.
  pub fn write_to(&self, options: &SynthOptions) -> Result<Vec<PathBuf>, SynthError> {
    let dir = &options.output_dir;
    fs::create_dir_all(dir).map_err(|source| SynthError::Io {
      path: dir.clone(),
      source,
    })?;

    let mut written = Vec::new();
    for (file, json) in self.render(options.pretty)? {
      written.push(write_document(dir, &file, &json)?);
    }

    if options.manifest {
      let json = if options.pretty {
        serde_json::to_string_pretty(&self.manifest)
      } else {
        serde_json::to_string(&self.manifest)
      }
      .map_err(|source| SynthError::Serialize {
        what: MANIFEST_FILE.to_string(),
        source,
      })?;
      written.push(write_document(dir, MANIFEST_FILE, &json)?);
    }

    Ok(written)
  }
}

fn write_document(dir: &Path, file: &str, json: &str) -> Result<PathBuf, SynthError> {
  let path = dir.join(file);
  fs::write(&path, json).map_err(|source| SynthError::Io {
    path: path.clone(),
    source,
  })?;
  debug!(path = %path.display(), "wrote document");
  Ok(path)
}

/// Render every top-level stack and assemble the manifest.
pub fn synthesize(app: &App, prepared: &Prepared) -> Result<CloudAssembly, SynthError> {
  let tree = app.tree();
  let context = prepared.render_context(tree);
  let mut manifest = AssemblyManifest::default();
  let mut documents = BTreeMap::new();

  for stack in tree.top_level_stacks() {
    let name = tree.stack_name(stack);
    if manifest.artifacts.contains_key(&name) {
      return Err(SynthError::DuplicateStackName(name));
    }

    let template = context.render(stack, Some(prepared.assets()))?;
    let template_file = format!("{name}{TEMPLATE_SUFFIX}");
    documents.insert(template_file.clone(), template);

    let artifact = StackArtifact {
      template_file,
      environment: tree.environment(stack)?.to_string(),
      assets: prepared.assets().assets_of(stack).map(AssetMetadata::from).collect(),
      dependencies: prepared.graph().dependency_names(stack)?,
    };
    debug!(
      stack = %name,
      assets = artifact.assets.len(),
      dependencies = artifact.dependencies.len(),
      "rendered stack"
    );
    manifest.artifacts.insert(name, artifact);
  }

  for nested in prepared.nested_templates() {
    documents.insert(nested.file.clone(), nested.template.clone());
  }

  Ok(CloudAssembly { manifest, documents })
}
