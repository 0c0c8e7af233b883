//! Tally API server.
//!
//! Opens the database pool once, wires the ledger dispatcher into the HTTP
//! router, and closes the pool after a graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_db::{LedgerSync, PgLedgerStore, TenantRepository, connect};
use tally_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tally_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let lock_timeout = config.ledger.lock_timeout();
    let dispatcher = LedgerSync::new(
        PgLedgerStore::new(db.clone(), lock_timeout),
        TenantRepository::new(db.clone()),
    );
    info!(lock_timeout_ms = config.ledger.lock_timeout_ms, "Ledger ready");

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        jwt_service: Arc::new(JwtService::new(&config.jwt)),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, closing database pool");
    db.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
