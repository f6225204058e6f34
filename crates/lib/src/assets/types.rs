use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::{ContentHash, DirHashError, hash_bytes, hash_directory, hash_file};

/// How an asset is packaged for publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Packaging {
  File,
  ContainerImage,
}

impl Packaging {
  /// The parameters a deployer must populate for an asset of this kind.
  pub fn slots(self) -> &'static [AssetSlot] {
    match self {
      Packaging::File => &[AssetSlot::S3Bucket, AssetSlot::S3VersionKey, AssetSlot::ArtifactHash],
      Packaging::ContainerImage => &[AssetSlot::ImageName],
    }
  }
}

/// One parameter in an asset's parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetSlot {
  S3Bucket,
  S3VersionKey,
  ArtifactHash,
  ImageName,
}

impl AssetSlot {
  pub fn name(self) -> &'static str {
    match self {
      AssetSlot::S3Bucket => "S3Bucket",
      AssetSlot::S3VersionKey => "S3VersionKey",
      AssetSlot::ArtifactHash => "ArtifactHash",
      AssetSlot::ImageName => "ImageName",
    }
  }

  pub fn description(self, hash: &ContentHash) -> String {
    match self {
      AssetSlot::S3Bucket => format!("S3 bucket for asset \"{hash}\""),
      AssetSlot::S3VersionKey => format!("S3 key for asset version \"{hash}\""),
      AssetSlot::ArtifactHash => format!("Artifact hash for asset \"{hash}\""),
      AssetSlot::ImageName => format!("ECR repository name and tag for asset \"{hash}\""),
    }
  }
}

impl fmt::Display for AssetSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Build context and options for a container image asset.
///
/// The context contents and the build options feed the content hash; the
/// directory path does not. The same context built with a different target
/// or build arguments is a different asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
  pub directory: PathBuf,
  #[serde(default)]
  pub build_args: BTreeMap<String, String>,
  #[serde(default)]
  pub target: Option<String>,
  #[serde(default)]
  pub file: Option<String>,
  #[serde(default)]
  pub repository_name: Option<String>,
}

/// The build options of an image, without the location of its context.
///
/// Only these and the context contents feed the image hash, so identical
/// images in different directories are one asset.
#[derive(Serialize)]
struct ImageOptions<'a> {
  build_args: &'a BTreeMap<String, String>,
  target: Option<&'a str>,
  file: Option<&'a str>,
  repository_name: Option<&'a str>,
}

impl<'a> From<&'a ImageSource> for ImageOptions<'a> {
  fn from(image: &'a ImageSource) -> Self {
    Self {
      build_args: &image.build_args,
      target: image.target.as_deref(),
      file: image.file.as_deref(),
      repository_name: image.repository_name.as_deref(),
    }
  }
}

/// What an asset is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
  /// A single file on disk.
  File(PathBuf),

  /// A directory, zipped at publish time. Entries named in `exclude` are skipped.
  Directory { path: PathBuf, exclude: Vec<String> },

  /// Bytes produced during synthesis, such as a nested stack template.
  Inline { name: String, contents: Vec<u8> },

  /// A container image built from a directory.
  ContainerImage(ImageSource),
}

impl AssetSource {
  pub fn packaging(&self) -> Packaging {
    match self {
      AssetSource::ContainerImage(_) => Packaging::ContainerImage,
      _ => Packaging::File,
    }
  }

  /// The local reference recorded in the assembly manifest.
  pub fn local_path(&self) -> String {
    match self {
      AssetSource::File(path) | AssetSource::Directory { path, .. } => path.display().to_string(),
      AssetSource::Inline { name, .. } => name.clone(),
      AssetSource::ContainerImage(image) => image.directory.display().to_string(),
    }
  }
}

/// Errors that can occur while hashing asset content.
#[derive(Debug, Error)]
pub enum AssetError {
  #[error("failed to hash asset '{path}': {source}")]
  Hash {
    path: String,
    #[source]
    source: DirHashError,
  },

  #[error("failed to serialize image options for '{path}': {source}")]
  ImageOptions {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// The bundling layer, as seen by the engine: something that can compute a
/// content hash for an asset source.
pub trait Bundler: fmt::Debug {
  fn content_hash(&self, source: &AssetSource) -> Result<ContentHash, AssetError>;
}

/// Hashes assets straight from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBundler;

impl Bundler for LocalBundler {
  fn content_hash(&self, source: &AssetSource) -> Result<ContentHash, AssetError> {
    match source {
      AssetSource::File(path) => hash_file(path).map_err(|e| AssetError::Hash {
        path: path.display().to_string(),
        source: e,
      }),
      AssetSource::Directory { path, exclude } => hash_directory(path, exclude).map_err(|e| AssetError::Hash {
        path: path.display().to_string(),
        source: e,
      }),
      AssetSource::Inline { contents, .. } => Ok(hash_bytes(contents)),
      AssetSource::ContainerImage(image) => {
        let context = hash_directory(&image.directory, &[]).map_err(|e| AssetError::Hash {
          path: image.directory.display().to_string(),
          source: e,
        })?;
        let options = serde_json::to_string(&ImageOptions::from(image)).map_err(|e| AssetError::ImageOptions {
          path: image.directory.display().to_string(),
          source: e,
        })?;
        Ok(hash_bytes(format!("{}\n{}", context.0, options).as_bytes()))
      }
    }
  }
}
