//! Stacks command - List available stack definitions.

use anyhow::Result;
use clap::Args;
use gantry_stacks::StackRegistry;

#[derive(Args)]
pub struct StacksArgs {}

pub async fn execute(_args: StacksArgs) -> Result<()> {
    let registry = StackRegistry::builtin();

    println!("📦 Available stacks:");
    for name in registry.names() {
        let builder = registry.get(&name).expect("listed name is registered");
        println!("   {} - {}", name, builder.description());
    }
    Ok(())
}
