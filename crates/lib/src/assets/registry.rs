use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::construct::NodeId;
use crate::consts::ASSET_KEY_SEPARATOR;
use crate::naming::asset_parameter_id;
use crate::placeholder::{AttributeRef, Placeholder, Pseudo, Source};
use crate::template::ParameterDef;
use crate::util::hash::ContentHash;

use super::types::{AssetSlot, Packaging};

/// A registered asset, as recorded on its top-level stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
  pub hash: ContentHash,
  pub packaging: Packaging,
  /// Local reference the publisher reads the content from.
  pub path: String,
}

impl AssetEntry {
  /// Logical id of the parameter filling `slot` for this asset.
  pub fn parameter_name(&self, slot: AssetSlot) -> String {
    asset_parameter_id(&self.hash.0, slot.name())
  }
}

/// Asset registry for one application.
///
/// Assets are always declared on a top-level stack, whatever stack they were
/// registered from; nested stacks receive the parameters they use through
/// the ordinary reference wiring. Within one top-level stack, entries are
/// keyed by content hash, so identical content collapses into one entry.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
  by_stack: BTreeMap<NodeId, IndexMap<ContentHash, AssetEntry>>,
}

impl AssetRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record an asset on `stack`. Returns `false` when an asset with the same
  /// content hash was already registered there.
  pub fn register(&mut self, stack: NodeId, hash: ContentHash, packaging: Packaging, path: String) -> bool {
    let entries = self.by_stack.entry(stack).or_default();
    if entries.contains_key(&hash) {
      debug!(%hash, %stack, "asset already registered, reusing parameters");
      return false;
    }
    debug!(%hash, %stack, ?packaging, path = %path, "registered asset");
    entries.insert(
      hash.clone(),
      AssetEntry {
        hash,
        packaging,
        path,
      },
    );
    true
  }

  /// Assets of a top-level stack, in registration order.
  pub fn assets_of(&self, stack: NodeId) -> impl Iterator<Item = &AssetEntry> {
    self.by_stack.get(&stack).into_iter().flat_map(|entries| entries.values())
  }

  pub fn get(&self, stack: NodeId, hash: &ContentHash) -> Option<&AssetEntry> {
    self.by_stack.get(&stack).and_then(|entries| entries.get(hash))
  }

  /// Parameter declarations a top-level stack must carry for its assets.
  pub fn parameters_of(&self, stack: NodeId) -> BTreeMap<String, ParameterDef> {
    let mut params = BTreeMap::new();
    for entry in self.assets_of(stack) {
      for slot in entry.packaging.slots() {
        params.insert(
          entry.parameter_name(*slot),
          ParameterDef::string().with_description(slot.description(&entry.hash)),
        );
      }
    }
    params
  }

  pub fn len(&self) -> usize {
    self.by_stack.values().map(|e| e.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

pub(crate) fn slot_value(stack: NodeId, hash: &ContentHash, slot: AssetSlot) -> Placeholder {
  Placeholder::Attribute(AttributeRef {
    source: Source::AssetParameter {
      stack,
      hash: hash.clone(),
      slot,
    },
    attribute: "Ref".to_string(),
  })
}

/// Handle to a file asset. Every accessor returns a deferred value homed at
/// the asset's top-level stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAsset {
  pub node: NodeId,
  pub stack: NodeId,
  pub hash: ContentHash,
}

impl FileAsset {
  pub fn bucket_name(&self) -> Placeholder {
    slot_value(self.stack, &self.hash, AssetSlot::S3Bucket)
  }

  /// The object key, assembled from the `<version>||<key>` parameter.
  pub fn object_key(&self) -> Placeholder {
    let key = slot_value(self.stack, &self.hash, AssetSlot::S3VersionKey);
    Placeholder::join(
      "",
      vec![
        Placeholder::select(0, Placeholder::split(ASSET_KEY_SEPARATOR, key.clone())),
        Placeholder::select(1, Placeholder::split(ASSET_KEY_SEPARATOR, key)),
      ],
    )
  }

  pub fn artifact_hash(&self) -> Placeholder {
    slot_value(self.stack, &self.hash, AssetSlot::ArtifactHash)
  }

  /// `https://s3.<region>.<url-suffix>/<bucket>/<key>`
  pub fn http_url(&self) -> Placeholder {
    Placeholder::join(
      "",
      vec![
        Placeholder::from("https://s3."),
        Placeholder::Pseudo(Pseudo::Region),
        Placeholder::from("."),
        Placeholder::Pseudo(Pseudo::UrlSuffix),
        Placeholder::from("/"),
        self.bucket_name(),
        Placeholder::from("/"),
        self.object_key(),
      ],
    )
  }

  /// `s3://<bucket>/<key>`
  pub fn s3_url(&self) -> Placeholder {
    Placeholder::join(
      "",
      vec![
        Placeholder::from("s3://"),
        self.bucket_name(),
        Placeholder::from("/"),
        self.object_key(),
      ],
    )
  }
}

/// Handle to a container image asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
  pub node: NodeId,
  pub stack: NodeId,
  pub hash: ContentHash,
}

impl ImageAsset {
  /// Repository name and tag, as supplied by the publisher.
  pub fn image_name(&self) -> Placeholder {
    slot_value(self.stack, &self.hash, AssetSlot::ImageName)
  }

  /// `<account>.dkr.ecr.<region>.<url-suffix>/<image name>`
  pub fn image_uri(&self) -> Placeholder {
    Placeholder::join(
      "",
      vec![
        Placeholder::Pseudo(Pseudo::AccountId),
        Placeholder::from(".dkr.ecr."),
        Placeholder::Pseudo(Pseudo::Region),
        Placeholder::from("."),
        Placeholder::Pseudo(Pseudo::UrlSuffix),
        Placeholder::from("/"),
        self.image_name(),
      ],
    )
  }
}
