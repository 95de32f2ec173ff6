use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use gavel::{
    app::App,
    auth::PlainTextVerifier,
    config::AppConfig,
    domain::{snapshot, store::DomainStore},
    lifecycle::sweeper,
    logger::init_tracing,
    server::acceptor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting gavel auction server...");

    let cfg = AppConfig::from_env();

    // State survives restart: rebuild the store from the last snapshot.
    let state = snapshot::load_state(&cfg.data_dir)
        .with_context(|| format!("restore snapshot from {}", cfg.data_dir.display()))?;
    let store = DomainStore::restore(state, cfg.limits.clone());

    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("bind {}", cfg.bind_addr))?;

    let app = App::new(cfg, store, Arc::new(PlainTextVerifier));

    tokio::spawn(sweeper::run(app.clone()));

    let acceptor = tokio::spawn(acceptor::run(app.clone(), listener));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    acceptor.abort();
    app.shutdown().await;

    Ok(())
}
