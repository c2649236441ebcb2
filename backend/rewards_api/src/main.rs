//! Green-points rewards backend entry point.
//!
//! Rebuilds the in-memory points ledger from the SQLite journal, starts a
//! background writer that journals every committed mutation, and exposes
//! the intake, marketplace and donation workflows over a small Axum REST API.

mod api;
mod config;
mod db;
mod errors;
mod journal;

use std::sync::Arc;

use points_ledger::{Catalog, PointsLedger, Rewards};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use journal::JournaledStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin(),
    };
    let catalog = Arc::new(catalog);
    info!(
        "Catalog loaded: {} waste types, {} products, {} projects",
        catalog.waste_types.len(),
        catalog.products.len(),
        catalog.projects.len()
    );

    // Set up the SQLite journal and rebuild ledger state from it.
    let pool = db::init_pool(&config.database_url).await?;
    let store = journal::hydrate(&pool, &catalog).await?;

    // ─── Background journal writer ────────────────────────
    let (store, rx) = JournaledStore::new(store);
    let shutdown = CancellationToken::new();
    let writer = tokio::spawn(journal::run(
        pool.clone(),
        rx,
        config.journal_batch_size,
        shutdown.clone(),
    ));

    let rewards = Rewards::new(catalog, PointsLedger::new(store));
    let account = rewards
        .ledger()
        .open_account(&config.default_account_id, config.opening_balance)?;
    info!("Default account {} at {} points", account.id, account.balance);

    // ─── REST API ─────────────────────────────────────────
    let app = api::router(Arc::new(api::ApiState {
        rewards,
        opening_balance: config.opening_balance,
    }));

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // Flush queued journal entries before exiting.
    shutdown.cancel();
    let flushed = writer.await?;
    pool.close().await;

    flushed?;
    Ok(())
}

/// Resolves on Ctrl-C, or when the journal writer gives up.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {e}");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => {
            tracing::error!("Journal writer stopped; shutting down");
        }
    }
}
