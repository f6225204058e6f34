//! Hashing utilities for content addressing and identifier generation.
//!
//! This module provides:
//! - `ContentHash`: a full 64-character hash identifying asset content
//! - `ObjectHash`: a truncated hash over a serialized value (manifests)
//! - `id_suffix()`: the fixed-length suffix appended to generated identifiers
//! - `hash_directory()`, `hash_file()`, `hash_bytes()`: deterministic content hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::ID_HASH_LEN;

pub type HashError = serde_json::Error;

/// Number of hex characters kept in an [`ObjectHash`].
const OBJECT_HASH_LEN: usize = 20;

/// A content-addressed hash identifying a serialized value.
///
/// The hash is a 20-character truncated SHA-256 of the JSON-serialized value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let full = format!("{:x}", hasher.finalize());
    Ok(ObjectHash(full[..OBJECT_HASH_LEN].to_string()))
  }
}

/// A full 64-character SHA-256 hash of asset content.
///
/// Two assets with the same `ContentHash` are the same asset: the registry
/// collapses them into a single parameter set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Uppercase hex suffix used to make generated identifiers collision-resistant.
///
/// Always [`ID_HASH_LEN`] characters long.
pub fn id_suffix(input: &str) -> String {
  let digest = Sha256::digest(input.as_bytes());
  let mut suffix = hex::encode_upper(digest);
  suffix.truncate(ID_HASH_LEN);
  suffix
}

/// Error during file or directory hashing.
#[derive(Debug, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum DirHashError {
  #[error("failed to walk directory: {message}")]
  WalkDir { message: String },

  #[error("failed to read file {path}: {message}")]
  ReadFile { path: String, message: String },

  #[error("failed to read symlink {path}: {message}")]
  ReadSymlink { path: String, message: String },
}

/// Compute a deterministic hash of a directory's contents.
///
/// The hash includes file contents, directory structure, and symlink targets,
/// but not metadata like timestamps or permissions. Entries are sorted by
/// path for determinism. Entries whose file name appears in `exclude` are
/// skipped together with everything below them.
pub fn hash_directory(path: &Path, exclude: &[String]) -> Result<ContentHash, DirHashError> {
  let mut entries: Vec<(String, String)> = Vec::new();

  let walker = WalkDir::new(path).sort_by_file_name().into_iter().filter_entry(|e| {
    e.file_name()
      .to_str()
      .map(|name| !exclude.iter().any(|x| x == name))
      .unwrap_or(true)
  });

  for entry in walker {
    let entry = entry.map_err(|e| DirHashError::WalkDir { message: e.to_string() })?;
    let entry_path = entry.path();

    // Relative paths use '/' regardless of platform so hashes are portable
    let rel_path = entry_path
      .strip_prefix(path)
      .unwrap_or(entry_path)
      .components()
      .map(|c| c.as_os_str().to_string_lossy().to_string())
      .collect::<Vec<_>>()
      .join("/");

    if rel_path.is_empty() {
      continue;
    }

    let file_type = entry.file_type();
    let entry_hash = if file_type.is_file() {
      let content_hash = hash_file(entry_path)?;
      format!("F:{}:{}", rel_path, content_hash.0)
    } else if file_type.is_dir() {
      format!("D:{}", rel_path)
    } else if file_type.is_symlink() {
      let target = fs::read_link(entry_path).map_err(|e| DirHashError::ReadSymlink {
        path: entry_path.display().to_string(),
        message: e.to_string(),
      })?;
      let target_hash = hash_bytes(target.to_string_lossy().as_bytes());
      format!("L:{}:{}", rel_path, target_hash.0)
    } else {
      continue;
    };

    entries.push((rel_path, entry_hash));
  }

  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (_, entry_hash) in entries {
    hasher.update(entry_hash.as_bytes());
    hasher.update(b"\n");
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> Result<ContentHash, DirHashError> {
  let mut file = fs::File::open(path).map_err(|e| DirHashError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  })?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(|e| DirHashError::ReadFile {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}
