//! Service entry point: ledger session, status listener and lifecycle
//! reconciler wired from the environment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chain::{Session, Submitter};
use listener::StatusListener;
use reconciler::{ChainSubmit, Config, LedgerRuntime, Reconciler, ReconcilerOptions};
use store::MemStore;

#[derive(Parser)]
#[command(name = "cinemint", about = "Asset lifecycle reconciliation service")]
struct Cli {
    /// Env file loaded before configuration.
    #[arg(long, default_value = ".env")]
    env_file: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // A missing env file is fine; the environment may be pre-populated.
    let _ = dotenvy::from_filename(&cli.env_file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    info!(endpoint = %config.chain_endpoint, "starting");

    let session = Arc::new(
        Session::connect(
            &config.chain_endpoint,
            &config.chain_secret,
            config.network_id,
        )
        .await
        .context("ledger session")?,
    );
    if session.sync_status().await.context("sync status")? {
        warn!("node is still syncing; confirmations may lag");
    }

    let probe = session.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            ticker.tick().await;
            if !probe.is_healthy().await {
                warn!("ledger connection unhealthy");
            }
        }
    });

    let submitter = Submitter::<LedgerRuntime>::new(session, config.submit());
    let submit = Arc::new(ChainSubmit::new(submitter));
    let listener = Arc::new(StatusListener::start(config.listener()));

    // The embedding application attaches its inbound surface to this
    // handle; the binary itself only keeps the workers alive.
    let _service = Reconciler::new(
        Arc::new(MemStore::new()),
        submit,
        Some(listener.clone()),
        ReconcilerOptions {
            storage_status_url: config.storage_status_url.clone(),
            mock_storage_status: config.mock_storage_status,
        },
    );

    info!("reconciler ready");
    tokio::signal::ctrl_c().await.context("signal handler")?;
    info!("shutting down");
    listener.shutdown();
    Ok(())
}
