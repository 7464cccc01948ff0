//! Up command - Apply a stack.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use gantry_engine::{
    ApplyStatus, CompositeProvider, Executor, FileStateStore, LocalProvider, OutputValue,
    RandomProvider,
};
use gantry_graph::ResourceState;
use tracing::{info, warn};

use super::StackOpts;

#[derive(Args)]
pub struct UpArgs {
    #[command(flatten)]
    pub opts: StackOpts,
}

pub async fn execute(args: UpArgs) -> Result<()> {
    let graph = args.opts.build_graph()?;
    info!("Applying stack '{}'", graph.stack());

    let frozen = graph.freeze()?;

    let provider = Arc::new(
        CompositeProvider::new()
            .route("random", Arc::new(RandomProvider::new()))
            .fallback(Arc::new(LocalProvider::new())),
    );
    let store = Arc::new(FileStateStore::new(&args.opts.state_dir));
    let executor = Executor::new(provider, store);

    // Ctrl-C stops new provisioning; in-flight calls run to completion.
    let cancel = executor.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, letting in-flight resources finish");
            cancel.cancel();
        }
    });

    println!("🚀 Applying stack '{}'...", frozen.stack());
    let result = executor.apply(&frozen).await?;

    for node in &result.nodes {
        match node.state {
            ResourceState::Provisioned => {
                let action = node
                    .action
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("   ✅ {} ({}, {})", node.name, node.resource_type, action);
            }
            ResourceState::Failed => {
                println!(
                    "   ❌ {} failed: {}",
                    node.name,
                    node.error.as_deref().unwrap_or("unknown error")
                );
            }
            ResourceState::Blocked => {
                println!(
                    "   ⛔ {} blocked: {}",
                    node.name,
                    node.error.as_deref().unwrap_or("dependency failed")
                );
            }
            _ => println!("   ⏳ {} not attempted", node.name),
        }
    }

    if !result.outputs.is_empty() {
        println!();
        println!("📤 Outputs:");
        for (name, value) in &result.outputs {
            match value {
                OutputValue::Resolved(v) => println!("   {} = {}", name, v),
                OutputValue::Unavailable => println!("   {} = <unavailable>", name),
            }
        }
    }

    println!();
    match result.status {
        ApplyStatus::Succeeded => {
            println!("✅ Stack '{}' applied successfully!", result.stack);
            Ok(())
        }
        ApplyStatus::PartiallyFailed => anyhow::bail!(
            "Apply partially failed: {} provisioned, {} failed, {} blocked",
            result.provisioned(),
            result.failed(),
            result.blocked()
        ),
        ApplyStatus::Failed => anyhow::bail!(
            "Apply failed: {} failed, {} blocked, nothing provisioned",
            result.failed(),
            result.blocked()
        ),
        ApplyStatus::Cancelled => anyhow::bail!("Apply cancelled before completion"),
    }
}
