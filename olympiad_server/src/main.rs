//! Bracket server.
//!
//! Serves the tournament and match API over HTTP, backed by PostgreSQL or,
//! with `--in-memory`, by a process-local store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use ctrlc::set_handler;
use log::info;
use olympiad::{BracketEngine, BracketStore, Database, MemoryStore};
use olympiad_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging, metrics,
};
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = "\
Run the olympiad bracket server

USAGE:
  olympiad_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/olympiad]

FLAGS:
  --in-memory              Keep tournaments in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  STORAGE_BACKEND          postgres or memory
  METRICS_BIND             Prometheus scrape address (disabled when unset)
  ROUND_INTERVAL_MINUTES   Spacing between rounds
  BRACKET_SEED             Fixed shuffle seed
  RUST_LOG                 Log filter
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        in_memory: pargs.contains("--in-memory"),
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
    };

    // SIGINT and SIGTERM trigger a graceful shutdown.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.in_memory)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics at http://{}/metrics", metrics_bind);
    }

    let (store, database): (Arc<dyn BracketStore>, Option<Database>) = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            (Arc::new(MemoryStore::new()), None)
        }
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.apply_schema()
                .await
                .context("Failed to apply database schema")?;
            info!("Database connected successfully");
            (Arc::new(db.store()), Some(db))
        }
    };

    let engine = Arc::new(BracketEngine::new(store, config.bracket.clone()));
    let app = api::create_router(api::AppState {
        engine,
        database: database.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Resolves once a termination signal has been received
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|&stop| stop).await.is_err() {
        log::error!("Shutdown signal handler dropped");
    }
}
