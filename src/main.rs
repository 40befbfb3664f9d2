//! Skyreg - captive portal auto-registration agent
//!
//! Periodically checks whether the device is stuck behind a SkyAdmin
//! captive portal and, if so, registers it against the property's guest
//! record without user interaction.

mod config;
mod error;
mod http;
mod models;
mod parser;
mod portal;
mod probe;
mod workflow;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, EnvironmentConfig};
use http::HttpClient;
use portal::{PortalTokenSource, RegistrationApi, SkyAdminClient, TokenSource};
use probe::{ConnectivityProbe, HttpProbe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;
use workflow::Workflow;

type SkyAdminWorkflow<F> = Workflow<HttpProbe, PortalTokenSource, F>;

#[derive(Parser, Debug)]
#[command(name = "skyreg")]
#[command(version)]
#[command(about = "Captive Portal Auto Registration Agent", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Run a single check cycle and exit
    #[arg(long)]
    once: bool,

    /// Config file path (default: skyreg.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = Config::load(args.config.as_deref())?;

    init_logging(&cfg, args.debug);

    tracing::info!(
        "Skyreg v{} - Captive Portal Auto Registration",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("==========================================");

    let env = Arc::new(EnvironmentConfig::from_env());
    let workflow = build_workflow(&cfg, env)?;

    if args.once {
        run_once(&workflow).await
    } else {
        run_daemon(&cfg, &workflow).await
    }
}

/// `RUST_LOG` wins; otherwise `--debug` or `LOG_LEVEL=debug` selects debug,
/// falling back to the configured level.
fn init_logging(cfg: &Config, debug: bool) {
    let level = if debug || std::env::var("LOG_LEVEL").is_ok_and(|l| l == "debug") {
        "debug"
    } else {
        cfg.logging.level.as_str()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

fn build_workflow(
    cfg: &Config,
    env: Arc<EnvironmentConfig>,
) -> Result<SkyAdminWorkflow<impl Fn(models::Credential) -> SkyAdminClient + Send + Sync>> {
    let client = Arc::new(HttpClient::new(&cfg.http).context("Failed to build HTTP client")?);
    let base_url = SkyAdminClient::parse_base_url(&cfg.endpoints.api_base_url)
        .with_context(|| format!("Invalid API base URL {}", cfg.endpoints.api_base_url))?;

    let probe = HttpProbe::new(
        client.clone(),
        cfg.endpoints.probe_url.as_str(),
        cfg.endpoints.portal_host.as_str(),
    );
    let tokens = PortalTokenSource::new(client.clone());

    let api_env = env.clone();
    let connect = move |credential| {
        SkyAdminClient::new(client.clone(), base_url.clone(), api_env.clone(), credential)
    };

    Ok(Workflow::new(probe, tokens, connect, env))
}

/// Run one cycle; a failed cycle becomes the process exit status
async fn run_once<P, T, F, A>(workflow: &Workflow<P, T, F>) -> Result<()>
where
    P: ConnectivityProbe,
    T: TokenSource,
    F: Fn(models::Credential) -> A + Send + Sync,
    A: RegistrationApi,
{
    let outcome = workflow.run_cycle().await?;
    tracing::info!("Cycle finished: {}", outcome);

    if outcome.is_failure() {
        anyhow::bail!("Registration did not complete: {}", outcome);
    }
    Ok(())
}

/// Run in daemon mode - one cycle per tick until Ctrl+C
async fn run_daemon<P, T, F, A>(cfg: &Config, workflow: &Workflow<P, T, F>) -> Result<()>
where
    P: ConnectivityProbe,
    T: TokenSource,
    F: Fn(models::Credential) -> A + Send + Sync,
    A: RegistrationApi,
{
    tracing::info!("Starting daemon mode...");
    tracing::info!("Check interval: {}s", cfg.global.check_interval);
    tracing::info!("---");

    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.global.check_interval));
    // A slow cycle pushes the next one back instead of bunching ticks up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match workflow.run_cycle().await {
                    Ok(outcome) if outcome.is_failure() => {
                        consecutive_failures += 1;
                        tracing::warn!(
                            "Cycle ended without registration: {} ({} in a row)",
                            outcome,
                            consecutive_failures
                        );
                    }
                    Ok(outcome) => {
                        if consecutive_failures > 0 {
                            tracing::debug!("Recovered after {} failed cycles", consecutive_failures);
                        }
                        consecutive_failures = 0;
                        tracing::debug!("Cycle finished: {}", outcome);
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        tracing::warn!(
                            "Device check failed, will retry on next cycle ({} in a row): {:#}",
                            consecutive_failures,
                            anyhow::Error::from(e)
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    Ok(())
}
