use std::{net::SocketAddr, sync::Arc};

use db::DBService;
use server::AppState;
use services::services::{config::Config, schema_health::SchemaHealthCheck};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init("info,server=debug,tower_http=debug");

    let config = Config::from_env()?;
    let db = DBService::new(&config.database_url).await?;

    SchemaHealthCheck::new(db.pool.clone())
        .require_healthy()
        .await?;

    let addr = SocketAddr::from((config.host, config.port));
    let state = AppState {
        db,
        config: Arc::new(config),
    };

    let app = server::router(state)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "tracker API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
