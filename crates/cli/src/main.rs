mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{cmd_graph, cmd_synth, cmd_validate};
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "weave")]
#[command(author, version, about = "Synthesize nested stack templates with cross-stack references wired", long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Synthesize an application definition into templates and a manifest
  Synth {
    /// Path to the application definition (JSON)
    definition: PathBuf,

    /// Output directory (default: weave.out)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
  },

  /// Print the deployment order of top-level stacks
  Graph {
    /// Path to the application definition (JSON)
    definition: PathBuf,
  },

  /// Check that an application definition synthesizes, without writing anything
  Validate {
    /// Path to the application definition (JSON)
    definition: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Synth {
      definition,
      output,
      compact,
    } => cmd_synth(&definition, output, compact, cli.verbose, cli.format),
    Commands::Graph { definition } => cmd_graph(&definition, cli.format),
    Commands::Validate { definition } => cmd_validate(&definition, cli.format),
  }
}
