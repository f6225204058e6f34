//! The construct tree.
//!
//! An application is a tree of constructs: groups for organization, stacks
//! that own templates, and the resources, parameters, outputs, and assets
//! that live inside them. The tree is built once and frozen before
//! synthesis; everything synthesis produces is derived from it through the
//! queries on [`Tree`].

mod resource;
mod stack;
mod tree;

pub use resource::*;
pub use stack::*;
pub use tree::*;
