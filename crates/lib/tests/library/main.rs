//! Integration tests for stackweave-lib.
//!
//! Each module builds applications through the public API and checks the
//! synthesized templates and manifest.

mod common;

mod assets_tests;
mod boundaries_tests;
mod synth_tests;
