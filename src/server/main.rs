use crate::{configs::ServerConfig, control_server::ControlServer};
use anyhow::Context;
use log::*;
use vclock::{start_engine, stop_engine, UpdaterExit};

mod configs;
mod control_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = ServerConfig::new().context("failed to load server config")?;
    info!("{config:?}");

    let engine = start_engine(&config.engine);
    let server = ControlServer::bind(&config.listen_address, engine.control())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;
    info!("Control server listening on {}", server.local_addr()?);

    // A failed updater only freezes the clock; the server keeps answering.
    tokio::select! {
        result = server.run() => result.context("control server failed")?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    match stop_engine(engine).await {
        UpdaterExit::Requested => Ok(()),
        UpdaterExit::Failed(err) => Err(err).context("updater stopped with an error"),
        UpdaterExit::Aborted => anyhow::bail!("updater task aborted"),
    }
}
