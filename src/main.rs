// src/main.rs
mod chart;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod poll;
mod realtime;
mod routes;
mod services;
mod state;
mod store;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use tokio::signal::{self, ctrl_c};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use config::{Config, StorageBackend};
use db::PgStore;
use state::AppState;
use store::{MemoryStore, PollStore};

const DEFAULT_LOG_FILTER: &str = "poll_service=info,tower_http=info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok(); // Load environment variables from .env file

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();

    let config = Config::load();

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn PollStore>, Box<dyn std::error::Error>> {
    match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL must be set for the postgres storage backend")?;
            let pool = db::create_pool(database_url, config.max_connections).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Initializing state...");
    let store = open_store(&config).await?;

    let address: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = routes::create_routes(AppState::new(store, config));

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    info!("Server running on {address}");
    axum_server::bind(address)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
