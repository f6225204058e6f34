use std::fmt;

use serde::{Deserialize, Serialize};

/// Target account and region of a stack. Either may be left open, in which
/// case the stack is environment-agnostic on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub account: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub region: Option<String>,
}

impl Environment {
  pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
    Self {
      account: Some(account.into()),
      region: Some(region.into()),
    }
  }

  /// Whether two environments are known to be different. Open axes never conflict.
  pub fn conflicts_with(&self, other: &Environment) -> bool {
    let differs = |a: &Option<String>, b: &Option<String>| matches!((a, b), (Some(a), Some(b)) if a != b);
    differs(&self.account, &other.account) || differs(&self.region, &other.region)
  }
}

impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "aws://{}/{}",
      self.account.as_deref().unwrap_or("unknown-account"),
      self.region.as_deref().unwrap_or("unknown-region")
    )
  }
}

/// Options for a top-level stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackProps {
  /// Deployed stack name. Derived from the construct path when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stack_name: Option<String>,
  #[serde(default)]
  pub env: Environment,
}

/// A stack is either deployed on its own or embedded in an ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackKind {
  TopLevel(StackProps),
  Nested,
}

impl StackKind {
  pub fn is_nested(&self) -> bool {
    matches!(self, StackKind::Nested)
  }
}

/// Deployed stack names start with a letter and contain only letters, digits, and hyphens.
pub fn is_valid_stack_name(name: &str) -> bool {
  let mut chars = name.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}
