mod graph;
mod synth;
mod validate;

pub use graph::cmd_graph;
pub use synth::cmd_synth;
pub use validate::cmd_validate;
