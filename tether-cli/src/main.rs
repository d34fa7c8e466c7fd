//! Tether CLI
//!
//! Command-line driver that submits jobs to a remote cluster and follows
//! them to completion.

mod commands;
mod config;
mod id_resolver;
mod namespace;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tether_client::OrchestratorConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Submit and follow jobs on a remote cluster", long_about = None)]
struct Cli {
    /// Job-submission API server URL
    #[arg(long, env = "TETHER_SERVER_URL", default_value = "http://localhost:8888")]
    server_url: String,

    /// Namespace to work in (read from the service account when omitted)
    #[arg(long, env = "TETHER_NAMESPACE")]
    namespace: Option<String>,

    /// Orchestrator settings as a JSON object
    /// (http_retries, wait_interval, wait_print_tmout, wait_job_ready_tmout, ...)
    #[arg(long, env = "TETHER_ADDITIONAL_PARAMS", default_value = "{}")]
    additional_params: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Job output goes to stdout, diagnostics to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether_cli=info,tether_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let orchestrator = OrchestratorConfig::from_json(&cli.additional_params)
        .context("Invalid --additional-params")?;

    let config = Config {
        server_url: cli.server_url,
        namespace: cli.namespace,
        orchestrator,
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
