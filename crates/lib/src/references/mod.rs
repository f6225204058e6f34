//! Cross-stack reference resolution.
//!
//! Runs once over the frozen tree during prepare:
//!
//! 1. [`discover`] scans every property of every construct and records a
//!    [`Reference`] wherever a value is consumed outside its home stack.
//! 2. [`classify`] works out which stacks lie between producer and consumer.
//! 3. [`Wiring`] adds the parameters, outputs, and exports each route needs
//!    and records how the consumer sees the value.
//!
//! Rendering then resolves every property through a [`StackResolver`] for
//! the stack being rendered.

mod catalog;
mod classify;
mod producer;
mod resolver;
mod wiring;

pub use catalog::{Reference, discover};
pub use classify::{Boundary, Route, classify};
pub use producer::{Producer, describe};
pub use resolver::StackResolver;
pub use wiring::{StackState, Wiring, WiringTable};
