// SocialHub server - social network backend over a SQLite document store

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use socialhub::{
    config::Config,
    core::IdGenerator,
    http::{router, AppState},
    store::{DocumentStore, SqliteStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socialhub=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn DocumentStore> = Arc::new(
        SqliteStore::connect(&config.database.url)
            .await
            .map_err(|e| anyhow::anyhow!("failed to open document store: {}", e))?,
    );
    let ids = Arc::new(IdGenerator::new(config.server.node_id));

    let state = AppState::new(store, ids);
    let app = router(state);

    let addr = config.server_address();
    info!("Server starting on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
