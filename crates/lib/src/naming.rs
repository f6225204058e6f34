//! Deterministic identifier generation.
//!
//! Every name the engine synthesizes (logical ids, reference parameters,
//! outputs, exports, asset parameters) is derived from construct paths, so
//! synthesizing the same tree twice always produces the same names. Names
//! combine a human-readable prefix with a fixed-length hash of the full path,
//! which keeps them readable while making collisions between different paths
//! practically impossible.

use crate::consts::{
  ASSET_PARAMETERS_SCOPE, EXPORTS_SCOPE, HIDDEN_FROM_HUMAN_ID, HIDDEN_ID, ID_HASH_LEN, MAX_HUMAN_LEN, MAX_ID_LEN,
  REFERENCE_PARAM_PREFIX,
};
use crate::util::hash::id_suffix;

/// Remove every character that is not ASCII alphanumeric.
pub fn remove_non_alphanumeric(s: &str) -> String {
  s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Compute a unique id from path components.
///
/// - `Default` components are dropped before anything else.
/// - A single remaining component is returned as-is (alphanumerics only)
///   when it fits within the human-readable limit.
/// - Otherwise the result is the human part (adjacent duplicates and
///   `Resource` components hidden, capped at 240 chars) followed by an
///   8-character hash of the `/`-joined components.
pub fn unique_id<S: AsRef<str>>(components: &[S]) -> String {
  let components: Vec<&str> = components
    .iter()
    .map(|c| c.as_ref())
    .filter(|c| *c != HIDDEN_ID)
    .collect();

  if components.is_empty() {
    return String::new();
  }

  if components.len() == 1 {
    let candidate = remove_non_alphanumeric(components[0]);
    if candidate.len() <= MAX_HUMAN_LEN {
      return candidate;
    }
  }

  let hash = id_suffix(&components.join("/"));
  let mut human: String = remove_dupes(&components)
    .into_iter()
    .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
    .map(remove_non_alphanumeric)
    .collect();
  human.truncate(MAX_HUMAN_LEN);

  format!("{human}{hash}")
}

/// Drop components that are a suffix of the component before them.
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
  let mut kept: Vec<&str> = Vec::with_capacity(components.len());
  for component in components {
    match kept.last() {
      Some(prev) if prev.ends_with(component) => {}
      _ => kept.push(component),
    }
  }
  kept
}

/// Keep a generated name within [`MAX_ID_LEN`], re-suffixing it with a hash
/// of the full name when it has to be truncated.
fn bounded(name: String) -> String {
  if name.len() <= MAX_ID_LEN {
    return name;
  }
  let suffix = id_suffix(&name);
  let mut truncated = name;
  truncated.truncate(MAX_ID_LEN - ID_HASH_LEN);
  truncated.push_str(&suffix);
  truncated
}

/// Name of the output a stack declares to expose `attribute` of the producer
/// at `producer_path` to its parent stack.
pub fn output_name<S: AsRef<str>>(producer_path: &[S], attribute: &str) -> String {
  bounded(format!(
    "{}{}",
    unique_id(producer_path),
    remove_non_alphanumeric(attribute)
  ))
}

/// Name of the parameter a nested stack declares to receive `attribute` of
/// the producer at `producer_path` from its parent stack.
pub fn reference_parameter_name<S: AsRef<str>>(producer_path: &[S], attribute: &str) -> String {
  bounded(format!(
    "{}{}{}",
    remove_non_alphanumeric(REFERENCE_PARAM_PREFIX),
    unique_id(producer_path),
    remove_non_alphanumeric(attribute)
  ))
}

/// Output id of an export, derived from the rendered value being exported.
pub fn export_output_id(rendered_value: &str) -> String {
  bounded(unique_id(&[EXPORTS_SCOPE.to_string(), format!("Output{rendered_value}")]))
}

/// Export name for an output of a top-level stack.
pub fn export_name(stack_name: &str, output_id: &str) -> String {
  format!("{stack_name}:{output_id}")
}

/// Logical id of one parameter in an asset's parameter set.
pub fn asset_parameter_id(hash: &str, slot: &str) -> String {
  unique_id(&[ASSET_PARAMETERS_SCOPE, hash, slot])
}
