//! CLI command definitions.
//!
//! Each subcommand maps to one phase of the stack lifecycle: preview the
//! plan, apply it, read back outputs, or list the available stacks.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use gantry_graph::ResourceGraph;
use gantry_stacks::{StackConfig, StackRegistry};

pub mod outputs;
pub mod preview;
pub mod stacks;
pub mod up;

/// gantry - declarative resource graph provisioning
#[derive(Parser)]
#[command(name = "gantry")]
#[command(version, about = "gantry - declarative resource graph provisioning")]
#[command(long_about = r#"
gantry provisions declared resource graphs: resources are declared with
their dependencies, validated, diffed against recorded state and applied
in dependency order with maximal parallelism.

WORKFLOWS:
  preview   → Show what an apply would change, without provisioning
  up        → Apply a stack: provision changed resources in order
  outputs   → Print the recorded outputs of a stack
  stacks    → List the available stack definitions

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Graph validation failure
  4 - Partial apply failure
  5 - Total apply failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preview the changes an apply would make
    Preview(preview::PreviewArgs),

    /// Apply a stack
    Up(up::UpArgs),

    /// Print the recorded outputs of a stack
    Outputs(outputs::OutputsArgs),

    /// List available stack definitions
    Stacks(stacks::StacksArgs),
}

/// Stack selection and configuration shared by preview and up.
#[derive(Args)]
pub struct StackOpts {
    /// Name of the stack definition
    pub stack: String,

    /// Environment tag woven into resource names
    #[arg(short, long, default_value = "dev")]
    pub env: String,

    /// Target location for location-bound resources
    #[arg(short, long, default_value = "westeurope")]
    pub location: String,

    /// Extra config values as key=value, repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Directory holding stack state snapshots
    #[arg(long, default_value = ".gantry/state")]
    pub state_dir: String,
}

impl StackOpts {
    /// Build the configured graph for the selected stack.
    pub fn build_graph(&self) -> Result<ResourceGraph> {
        let registry = StackRegistry::builtin();
        let Some(builder) = registry.get(&self.stack) else {
            bail!(
                "Stack not found: '{}' (available: {})",
                self.stack,
                registry.names().join(", ")
            );
        };

        let mut config = StackConfig::new(&self.env, &self.location);
        for entry in &self.set {
            let Some((key, value)) = entry.split_once('=') else {
                bail!("Invalid --set argument '{}', expected key=value", entry);
            };
            config = config.with_value(key, value);
        }

        Ok(builder.build(&config)?)
    }
}
