use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{assets, health, holdings, market, portfolios, transactions};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/assets", assets::router())
        .nest("/api/holdings", holdings::router())
        .nest("/api/market", market::router())
        .nest("/api/portfolios", portfolios::router())
        .nest("/api/transactions", transactions::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
