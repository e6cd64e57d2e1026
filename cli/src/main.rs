use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use gridstore_kernel::session::{ActiveCollections, DEFAULT_COLLECTION};
use gridstore_kernel::store::SqliteStore;

mod api;

/// Gridstore sheet API server
#[derive(Parser, Debug)]
#[command(name = "gridstore")]
#[command(about = "HTTP API for named sheets and their tables", long_about = None)]
struct Cli {
    /// SQLite database path, or `:memory:`
    #[arg(long, env = "GRIDSTORE_DATABASE")]
    database: String,

    /// Address to listen on
    #[arg(long, env = "GRIDSTORE_BIND", default_value = "0.0.0.0:5000")]
    bind: String,

    /// Seconds to wait for the store to open before giving up
    #[arg(long, env = "GRIDSTORE_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    connect_timeout_secs: u64,

    /// Collection targeted by sessions that never selected one
    #[arg(long, env = "GRIDSTORE_DEFAULT_COLLECTION", default_value = DEFAULT_COLLECTION)]
    default_collection: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ----------------------------
    // Environment & logging
    // ----------------------------
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // ----------------------------
    // Connect store
    // ----------------------------
    let store = match connect(&cli.database, Duration::from_secs(cli.connect_timeout_secs)).await
    {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "store connection failed");
            return Err(err);
        }
    };
    tracing::info!(database = %cli.database, "connected to store");

    // ----------------------------
    // Serve
    // ----------------------------
    let state = api::AppState::new(
        Arc::new(store),
        ActiveCollections::new(cli.default_collection),
    );

    let listener = TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    tracing::info!(addr = %cli.bind, "listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Open the store on the blocking pool, bounded by `timeout`.
async fn connect(database: &str, timeout: Duration) -> Result<SqliteStore> {
    let location = database.to_string();
    let opened = tokio::time::timeout(
        timeout,
        tokio::task::spawn_blocking(move || SqliteStore::open(&location)),
    )
    .await
    .with_context(|| format!("timed out after {timeout:?} opening {database}"))??;

    opened.with_context(|| format!("opening {database}"))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
