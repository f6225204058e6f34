//! stackweave-lib: reference resolution and nested-stack synthesis.
//!
//! An application is a tree of constructs: top-level stacks, nested stacks,
//! resources, parameters, outputs, and assets. Values that are only known at
//! deploy time are [`placeholder::Placeholder`]s, and may be consumed from
//! any stack in the tree. Synthesis finds every value that crosses a stack
//! boundary and rewrites it into the parameters, outputs, exports, and
//! imports the templates involved need:
//!
//! - `construct` / `app`: the construct tree and the build-phase API
//! - `references`: discovery, boundary classification, and wiring
//! - `assets`: content-addressed artifacts and their parameters
//! - `graph`: deploy ordering between top-level stacks
//! - `synth`: the prepare and render phases, and the cloud assembly
//! - `definition`: applications described as JSON documents

pub mod app;
pub mod assets;
pub mod construct;
pub mod consts;
pub mod definition;
pub mod graph;
pub mod manifest;
pub mod naming;
pub mod placeholder;
pub mod references;
pub mod synth;
pub mod template;
pub mod util;

pub use app::App;
