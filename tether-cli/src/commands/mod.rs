//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod execute;
mod job;

pub use execute::ExecuteArgs;
pub use job::JobCommands;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a job and follow it until it finishes
    Execute(ExecuteArgs),
    #[command(flatten)]
    Job(JobCommands),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Execute(args) => execute::handle_execute(args, config).await,
        Commands::Job(command) => job::handle_job_command(command, config).await,
    }
}

/// Parse the execution parameters passed to the job's entry point
pub(crate) fn parse_exec_params(json: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(json).context("Execution parameters must be a JSON object")
}

/// Token cancelled on Ctrl-C
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping follow (the remote job keeps running)");
            trigger.cancel();
        }
    });

    cancel
}
