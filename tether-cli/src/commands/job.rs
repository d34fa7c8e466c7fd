//! Job command handlers
//!
//! Handles operations on single submissions: submitting without following,
//! following an existing submission, status, logs, listing, stop and delete.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use tether_client::{JobHandle, JobInfo, JobManagerClient, JobStatus};

use super::execute::print_follow_outcome;
use super::{cancel_on_ctrl_c, parse_exec_params};
use crate::config::Config;
use crate::id_resolver::resolve_submission_id;
use crate::output::{TerminalSink, colorize_status};

/// Single-submission subcommands, available at the top level
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a job without following it
    Submit {
        /// Cluster (job) name
        #[arg(long)]
        name: String,

        /// Script to run; must be present in the cluster image
        #[arg(long, default_value = "transformer_launcher.py")]
        entrypoint: String,

        /// Execution parameters as a JSON object
        #[arg(long, default_value = "{}")]
        exec_params: String,
    },
    /// Follow a submitted job until it finishes
    Follow {
        /// Cluster (job) name
        #[arg(long)]
        name: String,

        /// Submission ID or unambiguous prefix
        submission_id: String,
    },
    /// Get job status
    Status {
        /// Cluster (job) name
        #[arg(long)]
        name: String,

        /// Submission ID or unambiguous prefix
        submission_id: String,
    },
    /// Get job logs
    Logs {
        /// Cluster (job) name
        #[arg(long)]
        name: String,

        /// Submission ID or unambiguous prefix
        submission_id: String,
    },
    /// List submissions on a cluster
    List {
        /// Cluster (job) name
        #[arg(long)]
        name: String,
    },
    /// Stop a running job
    Stop {
        /// Cluster (job) name
        #[arg(long)]
        name: String,

        /// Submission ID or unambiguous prefix
        submission_id: String,
    },
    /// Delete a finished job
    Delete {
        /// Cluster (job) name
        #[arg(long)]
        name: String,

        /// Submission ID or unambiguous prefix
        submission_id: String,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client()?;
    let namespace = config.resolve_namespace()?;

    match command {
        JobCommands::Submit {
            name,
            entrypoint,
            exec_params,
        } => submit_job(&client, &name, &namespace, &entrypoint, &exec_params).await,
        JobCommands::Follow {
            name,
            submission_id,
        } => {
            let handle = resolve_handle(&client, &name, &namespace, &submission_id).await?;
            follow_job(&client, config, &handle).await
        }
        JobCommands::Status {
            name,
            submission_id,
        } => {
            let handle = resolve_handle(&client, &name, &namespace, &submission_id).await?;
            get_job_status(&client, &handle).await
        }
        JobCommands::Logs {
            name,
            submission_id,
        } => {
            let handle = resolve_handle(&client, &name, &namespace, &submission_id).await?;
            get_job_logs(&client, &handle).await
        }
        JobCommands::List { name } => list_jobs(&client, &name, &namespace).await,
        JobCommands::Stop {
            name,
            submission_id,
        } => {
            let handle = resolve_handle(&client, &name, &namespace, &submission_id).await?;
            client.stop_job(&handle).await.context("Failed to stop job")?;
            println!("{} stop requested for {}", "✓".green(), handle);
            Ok(())
        }
        JobCommands::Delete {
            name,
            submission_id,
        } => {
            let handle = resolve_handle(&client, &name, &namespace, &submission_id).await?;
            client
                .delete_job(&handle)
                .await
                .context("Failed to delete job")?;
            println!("{} deleted {}", "✓".green(), handle);
            Ok(())
        }
    }
}

async fn resolve_handle(
    client: &JobManagerClient,
    name: &str,
    namespace: &str,
    submission_id: &str,
) -> Result<JobHandle> {
    let submission_id = resolve_submission_id(client, name, namespace, submission_id).await?;
    Ok(JobHandle::new(name, namespace, submission_id))
}

/// Submit a job and print its submission id
async fn submit_job(
    client: &JobManagerClient,
    name: &str,
    namespace: &str,
    entrypoint: &str,
    exec_params: &str,
) -> Result<()> {
    let params = parse_exec_params(exec_params)?;
    let outcome = client.submit_job(name, namespace, params, entrypoint).await;

    match outcome.submission_id() {
        Some(submission_id) => {
            println!("{} submission id {}", "✓".green(), submission_id.bold());
            Ok(())
        }
        None => bail!("Failed to submit job: {}", outcome),
    }
}

/// Follow an existing submission
async fn follow_job(client: &JobManagerClient, config: &Config, handle: &JobHandle) -> Result<()> {
    let cancel = cancel_on_ctrl_c();
    let outcome = client
        .follow_execution(
            handle,
            config.orchestrator.print_timeout,
            config.orchestrator.job_ready_timeout,
            &TerminalSink,
            &cancel,
        )
        .await;

    print_follow_outcome(&outcome);

    if outcome.is_failure() {
        bail!("Job {} did not succeed: {}", handle, outcome);
    }
    Ok(())
}

/// Get and display the status of a submission
async fn get_job_status(client: &JobManagerClient, handle: &JobHandle) -> Result<()> {
    let info = client
        .job_info(handle)
        .await
        .context("Failed to fetch job status")?;

    print_job_details(handle, &info);
    Ok(())
}

/// Get and display job logs
async fn get_job_logs(client: &JobManagerClient, handle: &JobHandle) -> Result<()> {
    let log = client
        .job_log(handle)
        .await
        .context("Failed to fetch job log")?;

    if log.is_empty() {
        println!("{}", "No logs found for this job.".yellow());
    } else {
        println!("{}", format!("Logs for job {}:", handle).bold());
        println!("{}", "─".repeat(80).dimmed());
        print!("{}", log);
        if !log.ends_with('\n') {
            println!();
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    Ok(())
}

/// List all submissions of a cluster
async fn list_jobs(client: &JobManagerClient, name: &str, namespace: &str) -> Result<()> {
    let jobs = client
        .list_jobs(name, namespace)
        .await
        .context("Failed to list jobs")?;

    if jobs.is_empty() {
        println!(
            "{}",
            format!("No jobs found on cluster {}.", name).yellow()
        );
    } else {
        println!(
            "{}",
            format!("Found {} job(s) on cluster {}:", jobs.len(), name).bold()
        );
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Print a one-entry summary of a submission
fn print_job_summary(job: &JobInfo) {
    println!("  {} Job {}", "▸".cyan(), job.submission_id.dimmed());
    println!("    Status:     {}", colorize_status(&job.status));
    if let Some(started) = job.started_at() {
        println!(
            "    Started:    {}",
            started.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

/// Print detailed job information
fn print_job_details(handle: &JobHandle, job: &JobInfo) {
    println!("{}", "Job Details:".bold());
    println!("  Submission:  {}", handle.submission_id.cyan());
    println!("  Cluster:     {}", handle.name);
    println!("  Namespace:   {}", handle.namespace);
    println!("  Status:      {}", colorize_status(&job.status));

    if let Some(entrypoint) = &job.entrypoint {
        println!("  Entrypoint:  {}", entrypoint.dimmed());
    }

    if let Some(started) = job.started_at() {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(ended) = job.ended_at() {
        println!("  Ended:       {}", ended.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = job.started_at() {
            let duration = ended.signed_duration_since(started);
            println!("  Duration:    {}s", duration.num_seconds());
        }
    }

    if let Some(message) = &job.message {
        println!("\n{}", "Message:".bold());
        if job.status.is_terminal() && job.status != JobStatus::Succeeded {
            println!("{}", message.red());
        } else {
            println!("{}", message);
        }
    }

    if let Some(error_type) = &job.error_type {
        println!("  Error type:  {}", error_type.red());
    }
}
