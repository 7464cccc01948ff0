//! Preview command - Show the plan without provisioning.

use anyhow::Result;
use clap::Args;
use gantry_engine::{preview, Action, FileStateStore, StateStore};
use tracing::info;

use super::StackOpts;

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub opts: StackOpts,
}

pub async fn execute(args: PreviewArgs) -> Result<()> {
    let graph = args.opts.build_graph()?;
    info!("Previewing stack '{}'", graph.stack());

    let frozen = graph.freeze()?;
    let store = FileStateStore::new(&args.opts.state_dir);
    let prior = store.load_prior_state(frozen.stack()).await?;

    let plan = preview(&frozen, prior.as_ref());

    println!("📋 Plan for stack '{}':", plan.stack);
    for step in &plan.steps {
        let marker = match step.action {
            Action::Create => "+",
            Action::Update => "~",
            Action::Unchanged => "=",
        };
        println!(
            "   {} {} {} ({})",
            marker, step.action, step.name, step.resource_type
        );
    }
    println!();
    println!(
        "   {} to create, {} to update, {} unchanged",
        plan.count(Action::Create),
        plan.count(Action::Update),
        plan.count(Action::Unchanged)
    );

    Ok(())
}
