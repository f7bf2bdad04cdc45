mod app;
mod db;
mod errors;
mod external;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::external::finnhub::FinnhubProvider;
use crate::logging::{init_logging, LoggingConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let provider = FinnhubProvider::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to create Finnhub provider: {e}"))?;

    let state = AppState {
        pool,
        quote_provider: Arc::new(provider),
    };
    let app = app::create_app(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Finfolio backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
