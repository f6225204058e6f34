//! Implementation of the `weave graph` command.
//!
//! Prints top-level stacks in deploy waves: every stack in a wave depends
//! only on stacks in earlier waves.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use stackweave_lib::definition::load_app;

use crate::output::{OutputFormat, format_names, print_info, print_json, print_stat};

#[derive(Serialize)]
struct GraphOutput {
  waves: Vec<Vec<String>>,
  dependencies: BTreeMap<String, Vec<String>>,
}

pub fn cmd_graph(definition: &Path, format: OutputFormat) -> Result<()> {
  let app = load_app(definition).with_context(|| format!("Failed to load definition: {}", definition.display()))?;
  let prepared = app.prepare().context("Failed to prepare application")?;
  let graph = prepared.graph();

  let waves: Vec<Vec<String>> = graph
    .deploy_waves()
    .context("Failed to order stacks")?
    .into_iter()
    .map(|wave| wave.into_iter().map(|stack| graph.name(stack)).collect())
    .collect();

  let mut dependencies = BTreeMap::new();
  for stack in app.tree().top_level_stacks() {
    dependencies.insert(graph.name(stack), graph.dependency_names(stack)?);
  }

  if format.is_json() {
    return print_json(&GraphOutput { waves, dependencies });
  }

  for (i, wave) in waves.iter().enumerate() {
    print_info(&format!("Wave {}: {}", i + 1, wave.join(", ")));
  }
  if dependencies.values().any(|deps| !deps.is_empty()) {
    println!();
    for (stack, deps) in &dependencies {
      print_stat(stack, &format_names(deps));
    }
  }
  Ok(())
}
