use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courant::config::{Cli, Config};
use courant::content::ContentStore;
use courant::db;
use courant::realtime::{self, Connections, PresenceRegistry};
use courant::routes;
use courant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Credential store
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;
    let purged = db::sessions::purge_expired(&pool)?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }
    if cli.seed {
        db::accounts::seed_accounts(&pool)?;
    }

    // Content store
    let content = ContentStore::connect(&config.content.uri, &config.content.database).await?;

    // Build app state
    let state = AppState {
        db: pool,
        content,
        config: config.clone(),
        presence: Arc::new(PresenceRegistry::new()),
        connections: Arc::new(Connections::new()),
    };

    // Build router
    let app = Router::new()
        .merge(routes::router())
        .merge(realtime::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
