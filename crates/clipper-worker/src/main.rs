//! Clip curation worker binary.
//!
//! Curates the clips of `CLIPPER_GAME_NAME` and prints the batch as JSON.

use anyhow::{anyhow, Context};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipper_twitch::TwitchClient;
use clipper_worker::{CurationEngine, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("clipper_worker=info".parse()?)
        .add_directive("clipper_twitch=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting clipper-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let game_name = config
        .game_name
        .clone()
        .ok_or_else(|| anyhow!("CLIPPER_GAME_NAME must be set"))?;

    let client = TwitchClient::from_env().context("Failed to create Twitch client")?;
    let engine = CurationEngine::new(config, client);

    let batch = match engine.run(&game_name).await {
        Ok(batch) => batch,
        Err(e) => {
            error!(stage = e.stage(), "Curation failed: {}", e);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&batch)?);
    info!(clips = batch.len(), satisfied = batch.satisfied, "Curation complete");

    Ok(())
}
