//! Execute command
//!
//! Submits a job and follows it to a terminal state, the way a pipeline
//! step drives a remote job.

use anyhow::{Result, bail};
use clap::Args;
use colored::*;
use tether_client::FollowOutcome;

use super::{cancel_on_ctrl_c, parse_exec_params};
use crate::config::Config;
use crate::output::{TerminalSink, colorize_status};

/// Arguments of the execute command
#[derive(Args)]
pub struct ExecuteArgs {
    /// Cluster (job) name
    #[arg(long)]
    pub name: String,

    /// Script to run; must be present in the cluster image
    #[arg(long, default_value = "transformer_launcher.py")]
    pub entrypoint: String,

    /// Execution parameters as a JSON object
    #[arg(long, default_value = "{}")]
    pub exec_params: String,
}

/// Handle the execute command
///
/// A submission that is not accepted is fatal. Follow outcomes other than a
/// successful completion are reported and turned into an error exit.
pub async fn handle_execute(args: ExecuteArgs, config: &Config) -> Result<()> {
    let namespace = config.resolve_namespace()?;
    let params = parse_exec_params(&args.exec_params)?;
    let client = config.client()?;

    let outcome = client
        .submit_job(&args.name, &namespace, params, &args.entrypoint)
        .await;
    let (status, error, submission_id) = outcome.clone().into_parts();

    let Some(handle) = outcome.into_handle(&args.name, &namespace) else {
        bail!(
            "Failed to submit job - status: {}, error: {}, submission id {}",
            status,
            error,
            submission_id
        );
    };

    println!(
        "{} job {} in namespace {} (submission id {})",
        "Submitted".green(),
        args.name.cyan(),
        namespace,
        handle.submission_id.bold()
    );

    let cancel = cancel_on_ctrl_c();
    let result = client
        .follow_execution(
            &handle,
            config.orchestrator.print_timeout,
            config.orchestrator.job_ready_timeout,
            &TerminalSink,
            &cancel,
        )
        .await;

    print_follow_outcome(&result);

    if result.is_failure() {
        bail!("Job {} did not succeed: {}", handle, result);
    }

    Ok(())
}

/// Print the outcome of a follow
pub(crate) fn print_follow_outcome(outcome: &FollowOutcome) {
    println!("{}", "─".repeat(80).dimmed());
    match outcome {
        FollowOutcome::Completed { final_status, .. } => {
            println!("{} {}", "Job finished:".bold(), colorize_status(final_status));
        }
        _ => {
            if let Some(status) = outcome.last_status() {
                println!("{} {}", "Last status:".bold(), colorize_status(&status));
            }
        }
    }
    if outcome.is_failure() {
        println!("{}", outcome.to_string().red());
    } else {
        println!("{}", outcome.to_string().green());
    }
}
