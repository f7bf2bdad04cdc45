use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{PortfolioSnapshot, PortfolioSummary, TopPerformers};
use crate::services;
use crate::services::market_data_service::BatchUpdateOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/:username", get(get_portfolio))
        .route("/user/:username/top-performers", get(top_performers))
        .route("/user/:username/refresh-prices", post(refresh_prices))
        .route("/user/:username/history", get(portfolio_history))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct DaysQuery {
    days: Option<i64>,
}

async fn get_portfolio(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PortfolioSummary>, AppError> {
    info!("GET /portfolios/user/{} - Getting portfolio", username);
    let summary = services::portfolio_service::get_portfolio(
        &state.pool,
        state.quote_provider.as_ref(),
        &username,
    )
    .await
    .map_err(|e| {
        error!("Failed to get portfolio for {}: {}", username, e);
        e
    })?;
    Ok(Json(summary))
}

async fn top_performers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<TopPerformers>, AppError> {
    let limit = query.limit.unwrap_or(5);
    info!(
        "GET /portfolios/user/{}/top-performers - Top {}",
        username, limit
    );
    let performers = services::portfolio_service::top_performers(
        &state.pool,
        state.quote_provider.as_ref(),
        &username,
        limit,
    )
    .await
    .map_err(|e| {
        error!("Failed to get top performers for {}: {}", username, e);
        e
    })?;
    Ok(Json(performers))
}

async fn refresh_prices(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<BatchUpdateOutcome>>, AppError> {
    info!("POST /portfolios/user/{}/refresh-prices", username);
    let outcomes = services::portfolio_service::refresh_prices(
        &state.pool,
        state.quote_provider.as_ref(),
        &username,
    )
    .await
    .map_err(|e| {
        error!("Failed to refresh prices for {}: {}", username, e);
        e
    })?;
    Ok(Json(outcomes))
}

async fn portfolio_history(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<PortfolioSnapshot>>, AppError> {
    let days = query.days.unwrap_or(30);
    info!(
        "GET /portfolios/user/{}/history - Last {} snapshots",
        username, days
    );
    let snapshots =
        services::portfolio_service::portfolio_history(&state.pool, &username, days)
            .await
            .map_err(|e| {
                error!("Failed to get portfolio history for {}: {}", username, e);
                e
            })?;
    Ok(Json(snapshots))
}
