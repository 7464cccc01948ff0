//! gantry CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Graph validation failure
//! - 4: Partial apply failure
//! - 5: Total apply failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const PARTIAL_APPLY: u8 = 4;
    pub const APPLY_FAILURE: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive("gantry=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview(args) => commands::preview::execute(args).await,
        Commands::Up(args) => commands::up::execute(args).await,
        Commands::Outputs(args) => commands::outputs::execute(args).await,
        Commands::Stacks(args) => commands::stacks::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let msg = e.to_string().to_lowercase();

    if msg.contains("cycle") || msg.contains("duplicate") || msg.contains("unknown node") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("partially failed") {
        ExitCodes::PARTIAL_APPLY
    } else if msg.contains("apply failed") {
        ExitCodes::APPLY_FAILURE
    } else if msg.contains("argument") || msg.contains("not found") || msg.contains("missing required")
    {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_error_exit_codes() {
        let cases = [
            (
                "Dependency cycle detected: a -> b -> a",
                ExitCodes::VALIDATION_FAILURE,
            ),
            ("Duplicate resource name 'rg'", ExitCodes::VALIDATION_FAILURE),
            ("Apply partially failed: 2 resources", ExitCodes::PARTIAL_APPLY),
            ("Apply failed: nothing provisioned", ExitCodes::APPLY_FAILURE),
            ("Stack not found: unknown", ExitCodes::INVALID_ARGS),
            (
                "Missing required config value 'edgeVM.adminUsername'",
                ExitCodes::INVALID_ARGS,
            ),
            ("connection reset by peer", ExitCodes::GENERAL_ERROR),
        ];

        for (message, expected) in cases {
            assert_eq!(
                categorize_error(&anyhow::anyhow!(message)),
                expected,
                "message: {message}"
            );
        }
    }
}
