//! Implementation of the `weave validate` command.
//!
//! Builds and synthesizes an application in memory without writing anything.
//! Exits with status 1 and the full error chain when the application is
//! invalid.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use stackweave_lib::definition::load_app;
use stackweave_lib::synth::synthesize;

use crate::output::{OutputFormat, print_error, print_json, print_success};

#[derive(Serialize)]
struct ValidateOutput {
  valid: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
  references: usize,
  nested_stacks: usize,
}

pub fn cmd_validate(definition: &Path, format: OutputFormat) -> Result<()> {
  let result = load_app(definition)
    .with_context(|| format!("Failed to load definition: {}", definition.display()))
    .and_then(|app| {
      let prepared = app.prepare().context("Failed to prepare application")?;
      synthesize(&app, &prepared).context("Synthesis failed")?;
      Ok(prepared)
    });

  match result {
    Ok(prepared) => {
      let references = prepared.references().len();
      let nested_stacks = prepared.nested_templates().count();
      if format.is_json() {
        print_json(&ValidateOutput {
          valid: true,
          error: None,
          references,
          nested_stacks,
        })?;
      } else {
        print_success(&format!(
          "{} is valid ({} reference(s), {} nested stack(s))",
          definition.display(),
          references,
          nested_stacks
        ));
      }
      Ok(())
    }
    Err(e) => {
      if format.is_json() {
        print_json(&ValidateOutput {
          valid: false,
          error: Some(format!("{e:#}")),
          references: 0,
          nested_stacks: 0,
        })?;
      } else {
        print_error(&format!("{e:#}"));
      }
      std::process::exit(1);
    }
  }
}
