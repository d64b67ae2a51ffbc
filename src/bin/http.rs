use std::path::PathBuf;

use anyhow::Context;
use schedule_engine::{EngineConfig, http_api};

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SCHEDULE_ENGINE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config_path = std::env::var_os("SCHEDULE_ENGINE_CONFIG").map(PathBuf::from);
    let config =
        EngineConfig::load(config_path.as_deref()).context("failed to load engine configuration")?;
    let addr = config.http_addr()?;

    tracing::info!(%addr, "schedule-engine HTTP API listening");
    http_api::serve(addr, config.defaults)
        .await
        .with_context(|| format!("HTTP server on {addr} stopped"))?;
    Ok(())
}
