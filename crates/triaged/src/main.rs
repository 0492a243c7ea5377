//! Triage Daemon - streaming healthcare triage agent.
//!
//! Tails patient intake events, decides each via the reasoning service or
//! the deterministic fallback, and appends decisions to the output log.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use triaged::config::Config;
use triaged::pipeline::TriagePipeline;
use triaged::reasoning::HttpReasoningClient;

#[derive(Parser, Debug)]
#[command(name = "triaged", version, about = "Streaming healthcare triage daemon")]
struct Args {
    /// Config file (TOML); missing file means defaults
    #[arg(long, default_value = "triaged.toml")]
    config: PathBuf,

    /// Override the directory holding patients/resources/guidelines
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the directory holding the decision log
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("triaged v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&args.config)?;
    if let Some(dir) = &args.data_dir {
        config.paths.rebase_data(dir);
    }
    if let Some(dir) = &args.output_dir {
        config.paths.rebase_output(dir);
    }

    let api_key = std::env::var(&config.reasoning.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());

    // Credential absence is detected before any call attempt. Whether it is
    // fatal depends on whether fallback-only operation is permitted.
    if config.reasoning.enabled && api_key.is_none() {
        if config.reasoning.allow_fallback_only {
            warn!(
                "No API key in ${}; running in fallback-only mode",
                config.reasoning.api_key_env
            );
        } else {
            anyhow::bail!(
                "no API key in ${} and fallback-only mode is not permitted \
                 (set reasoning.allow_fallback_only = true to run without one)",
                config.reasoning.api_key_env
            );
        }
    }
    if !config.reasoning.enabled {
        warn!("Reasoning disabled; every decision will use the fallback engine");
    }

    let client = HttpReasoningClient::new(
        &config.reasoning.endpoint,
        &config.reasoning.model,
        api_key,
        config.reasoning.enabled,
        config.reasoning.timeout_secs,
    )?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline = TriagePipeline::new(&config, Box::new(client), shutdown_rx)?;
    let handle = tokio::spawn(pipeline.run());

    supervise(shutdown_tx, handle).await?;

    info!("Shut down gracefully");
    Ok(())
}

/// Wait for an interrupt or for the pipeline ending on its own.
///
/// The pipeline only returns once shutdown is signalled; ending without
/// being asked means an infrastructure failure (persistence unavailable),
/// which must terminate the process non-zero immediately rather than leave
/// a daemon that accepts no work.
async fn supervise(
    shutdown: watch::Sender<bool>,
    mut pipeline: JoinHandle<Result<()>>,
) -> Result<()> {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutdown requested, finishing in-flight work");
            let _ = shutdown.send(true);
            pipeline.await??;
        }
        res = &mut pipeline => {
            res??;
            anyhow::bail!("pipeline stopped without a shutdown request");
        }
    }
    Ok(())
}
