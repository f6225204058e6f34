//! Content-addressed assets and their deployment parameters.
//!
//! An asset is an external artifact (a file, a directory, a container image
//! build context, or a synthesized nested template) that a template refers
//! to. Assets are identified by a hash of their content, so registering the
//! same content twice within one top-level stack yields one parameter set.
//!
//! # Submodules
//!
//! - `types` - asset sources, parameter slots, and the [`Bundler`] seam
//! - `registry` - per-stack registry and the handles user code consumes

mod registry;
mod types;

pub use registry::*;
pub use types::*;
