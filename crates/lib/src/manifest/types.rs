//! Assembly manifest types.
//!
//! The manifest is what the deployment layer reads after synthesis. For each
//! top-level stack it records the template document to deploy, the target
//! environment, the assets a publisher must upload before deploying (with
//! the exact parameter names to populate), and the stacks that must be
//! deployed first.
//!
//! # Serialization
//!
//! Maps are [`BTreeMap`]s so the serialized manifest is byte-for-byte stable
//! across runs over the same application, which keeps
//! [`Hashable::compute_hash`] meaningful for quick equality checks.
//!
//! # Example
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "artifacts": {
//!     "Parent": {
//!       "templateFile": "Parent.template.json",
//!       "environment": "aws://unknown-account/unknown-region",
//!       "assets": [
//!         {
//!           "id": "5e2b...",
//!           "packaging": "file",
//!           "path": "ParentNested1A1B2C3D4.nested.template.json",
//!           "sourceHash": "5e2b...",
//!           "parameters": { "S3Bucket": "AssetParameters5e2b...S3Bucket1A2B3C4D", ... }
//!         }
//!       ],
//!       "dependencies": []
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assets::{AssetEntry, Packaging};
use crate::consts::MANIFEST_VERSION;
use crate::util::hash::{ContentHash, Hashable};

/// Manifest of a synthesized application, keyed by stack name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyManifest {
  pub version: String,
  pub artifacts: BTreeMap<String, StackArtifact>,
}

impl Default for AssemblyManifest {
  fn default() -> Self {
    Self {
      version: MANIFEST_VERSION.to_string(),
      artifacts: BTreeMap::new(),
    }
  }
}

impl Hashable for AssemblyManifest {}

/// One independently deployable stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
  pub template_file: String,
  pub environment: String,
  #[serde(default)]
  pub assets: Vec<AssetMetadata>,
  /// Names of stacks that must be deployed first.
  #[serde(default)]
  pub dependencies: Vec<String>,
}

/// What a publisher needs to upload one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
  pub id: String,
  pub packaging: Packaging,
  pub path: String,
  pub source_hash: ContentHash,
  /// Parameter slot name to the template parameter to populate.
  pub parameters: BTreeMap<String, String>,
}

impl From<&AssetEntry> for AssetMetadata {
  fn from(entry: &AssetEntry) -> Self {
    Self {
      id: entry.hash.0.clone(),
      packaging: entry.packaging,
      path: entry.path.clone(),
      source_hash: entry.hash.clone(),
      parameters: entry
        .packaging
        .slots()
        .iter()
        .map(|slot| (slot.name().to_string(), entry.parameter_name(*slot)))
        .collect(),
    }
  }
}
