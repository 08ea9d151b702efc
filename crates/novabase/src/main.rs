//! NovaBase server
//!
//! Serves the registered tables of a SQLite or PostgreSQL database as a
//! generic multi-tenant API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use novabase_persistence::core::{Backend, TransactionProvider};
use novabase_rest::{AppState, ServerConfig, app_from_state, init_logging};
use tracing::info;

#[cfg(feature = "sqlite")]
use novabase_persistence::backends::sqlite::SqliteBackend;

/// Database used when no URL is configured.
const DEFAULT_SQLITE_PATH: &str = "novabase.db";

/// Store selected by the configured database URL.
#[derive(Debug, PartialEq, Eq)]
enum StoreTarget<'a> {
    Sqlite(&'a str),
    Postgres(&'a str),
}

fn store_target(database_url: Option<&str>) -> StoreTarget<'_> {
    match database_url {
        None => StoreTarget::Sqlite(DEFAULT_SQLITE_PATH),
        Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
            StoreTarget::Postgres(url)
        }
        Some(url) => StoreTarget::Sqlite(url.strip_prefix("sqlite://").unwrap_or(url)),
    }
}

/// Registers the configured tables, builds the router and serves it.
async fn serve<B>(backend: Arc<B>, config: ServerConfig) -> anyhow::Result<()>
where
    B: Backend + TransactionProvider + 'static,
{
    let state = AppState::new(backend, config.clone());

    for table in config.exposed_tables() {
        state
            .engine()
            .register_table(table)
            .await
            .with_context(|| format!("Failed to register table '{}'", table))?;
        info!(table = %table, "Table exposed");
    }

    let app = app_from_state(state);

    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        rate_limit = config.rate_limit,
        "Starting NovaBase server"
    );

    let database_url = config.database_url.clone();
    match store_target(database_url.as_deref()) {
        StoreTarget::Sqlite(path) => start_sqlite(path, config).await,
        StoreTarget::Postgres(url) => start_postgres(url, config).await,
    }
}

/// Starts the server with the SQLite backend.
#[cfg(feature = "sqlite")]
async fn start_sqlite(path: &str, config: ServerConfig) -> anyhow::Result<()> {
    info!(database = %path, "Initializing SQLite backend");

    let backend = if path == ":memory:" {
        SqliteBackend::in_memory()?
    } else {
        SqliteBackend::open(path)?
    };
    backend.init_schema()?;

    serve(Arc::new(backend), config).await
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn start_sqlite(_path: &str, _config: ServerConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p novabase --features sqlite"
    )
}

/// Starts the server with the PostgreSQL backend.
#[cfg(feature = "postgres")]
async fn start_postgres(url: &str, config: ServerConfig) -> anyhow::Result<()> {
    use novabase_persistence::backends::postgres::PostgresBackend;

    info!("Initializing PostgreSQL backend from connection string");
    let backend = PostgresBackend::from_connection_string(url).await?;
    backend.init_schema().await?;

    serve(Arc::new(backend), config).await
}

/// Fallback when postgres feature is not enabled.
#[cfg(not(feature = "postgres"))]
async fn start_postgres(_url: &str, _config: ServerConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The postgres backend requires the 'postgres' feature. \
         Build with: cargo build -p novabase --features postgres"
    )
}

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("At least one database backend feature must be enabled");
