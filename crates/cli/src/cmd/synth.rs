//! Implementation of the `weave synth` command.
//!
//! Loads a definition, synthesizes it, and writes every template plus the
//! manifest to the output directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use stackweave_lib::definition::load_app;
use stackweave_lib::synth::SynthOptions;
use stackweave_lib::util::hash::Hashable;

use crate::output::{
  OutputFormat, format_names, print_info, print_json, print_stat, print_success, print_warning, symbols,
  truncate_hash,
};

#[derive(Serialize)]
struct SynthOutput {
  output_dir: PathBuf,
  manifest_hash: String,
  stacks: Vec<StackSummary>,
  documents: Vec<String>,
}

#[derive(Serialize)]
struct StackSummary {
  name: String,
  template: String,
  environment: String,
  assets: usize,
  dependencies: Vec<String>,
}

pub fn cmd_synth(
  definition: &Path,
  output_dir: Option<PathBuf>,
  compact: bool,
  verbose: bool,
  format: OutputFormat,
) -> Result<()> {
  let app = load_app(definition).with_context(|| format!("Failed to load definition: {}", definition.display()))?;
  let assembly = app.synth().context("Synthesis failed")?;

  let mut options = SynthOptions {
    pretty: !compact,
    ..Default::default()
  };
  if let Some(dir) = output_dir {
    options.output_dir = dir;
  }
  assembly
    .write_to(&options)
    .with_context(|| format!("Failed to write assembly to {}", options.output_dir.display()))?;

  let manifest_hash = assembly
    .manifest
    .compute_hash()
    .context("Failed to hash manifest")?
    .0;

  let stacks: Vec<StackSummary> = assembly
    .manifest
    .artifacts
    .iter()
    .map(|(name, artifact)| StackSummary {
      name: name.clone(),
      template: artifact.template_file.clone(),
      environment: artifact.environment.clone(),
      assets: artifact.assets.len(),
      dependencies: artifact.dependencies.clone(),
    })
    .collect();

  if format.is_json() {
    return print_json(&SynthOutput {
      output_dir: options.output_dir,
      manifest_hash,
      stacks,
      documents: assembly.documents.keys().cloned().collect(),
    });
  }

  if stacks.is_empty() {
    print_warning("Definition declares no stacks");
  }

  for stack in &stacks {
    print_success(&format!("{} {} {}", stack.name, symbols::ARROW, stack.template));
    print_stat("Environment", &stack.environment);
    print_stat("Assets", &stack.assets.to_string());
    print_stat("Depends on", &format_names(&stack.dependencies));

    if verbose && let Some(artifact) = assembly.manifest.artifacts.get(&stack.name) {
      for asset in &artifact.assets {
        println!("    {} {} {}", symbols::INFO, truncate_hash(&asset.source_hash.0), asset.path);
      }
    }
  }

  println!();
  print_info(&format!(
    "Wrote {} document(s) to {}",
    assembly.documents.len(),
    options.output_dir.display()
  ));
  if verbose {
    print_stat("Manifest", &manifest_hash);
  }
  Ok(())
}
