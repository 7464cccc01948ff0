//! Outputs command - Print the recorded outputs of a stack.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use gantry_engine::{read_state_file, FileStateStore, OutputValue};

#[derive(Args)]
pub struct OutputsArgs {
    /// Name of the stack definition
    pub stack: String,

    /// Environment tag
    #[arg(short, long, default_value = "dev")]
    pub env: String,

    /// Directory holding stack state snapshots
    #[arg(long, default_value = ".gantry/state")]
    pub state_dir: String,

    /// Print outputs as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: OutputsArgs) -> Result<()> {
    // Stack instances are stored under "<stack>-<env>".
    let instance = format!("{}-{}", args.stack, args.env);
    let store = FileStateStore::new(&args.state_dir);
    let path = store.state_path(&instance);

    if !Path::new(&path).exists() {
        anyhow::bail!("State not found for stack '{}' (no apply recorded)", instance);
    }
    let state = read_state_file(&path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state.outputs)?);
        return Ok(());
    }

    println!("📤 Outputs of stack '{}':", state.stack);
    for (name, value) in &state.outputs {
        match value {
            OutputValue::Resolved(v) => println!("   {} = {}", name, v),
            OutputValue::Unavailable => println!("   {} = <unavailable>", name),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_engine::{StackState, StateStore};
    use tempfile::tempdir;

    fn args(state_dir: &str) -> OutputsArgs {
        OutputsArgs {
            stack: "iot".to_string(),
            env: "dev".to_string(),
            state_dir: state_dir.to_string(),
            json: false,
        }
    }

    #[tokio::test]
    async fn test_outputs_without_state_is_not_found() {
        let dir = tempdir().unwrap();
        let err = execute(args(dir.path().to_str().unwrap())).await.unwrap_err();
        assert!(err.to_string().contains("State not found"));
    }

    #[tokio::test]
    async fn test_outputs_reads_recorded_state() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        let mut state = StackState::new("iot-dev");
        state.outputs.insert(
            "publicIp".to_string(),
            OutputValue::Resolved(serde_json::json!("10.1.2.3")),
        );
        store.save_posterior_state(&state).await.unwrap();

        execute(args(dir.path().to_str().unwrap())).await.unwrap();
    }
}
