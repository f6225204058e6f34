//! Assembly manifest types.
//!
//! The manifest describes a synthesized application to the deployment
//! layer: per stack, its template, environment, assets, and dependencies.

mod types;

pub use types::*;
