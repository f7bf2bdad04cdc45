use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::errors::AppError;
use crate::services::market_data_service::{
    self, BatchUpdateOutcome, DetailedMarketData, MarketData, UpsertAssetResult,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quote/:ticker", get(get_quote))
        .route("/quote/:ticker/detailed", get(get_detailed_quote))
        .route("/validate/:ticker", get(validate_ticker))
        .route("/assets/:ticker/upsert", post(upsert_asset))
        .route("/batch/quotes", post(batch_quotes))
        .route("/batch/update", post(batch_update))
}

#[derive(Deserialize)]
struct BatchQuotesRequest {
    tickers: Vec<String>,
}

#[derive(Deserialize)]
struct BatchUpdateRequest {
    tickers: Vec<String>,
    #[serde(default)]
    update_history: bool,
}

async fn get_quote(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<MarketData>, AppError> {
    info!("GET /market/quote/{} - Getting quote", ticker);
    let data = market_data_service::get_asset_data(
        &state.pool,
        state.quote_provider.as_ref(),
        &ticker,
    )
    .await
    .map_err(|e| {
        error!("Failed to get quote for {}: {}", ticker, e);
        e
    })?;
    Ok(Json(data))
}

async fn get_detailed_quote(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<DetailedMarketData>, AppError> {
    info!("GET /market/quote/{}/detailed - Getting detailed quote", ticker);
    let data =
        market_data_service::get_detailed_asset_data(state.quote_provider.as_ref(), &ticker, None)
            .await
            .map_err(|e| {
                error!("Failed to get detailed quote for {}: {}", ticker, e);
                e
            })?;
    Ok(Json(data))
}

async fn validate_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!("GET /market/validate/{} - Validating ticker", ticker);
    let valid = market_data_service::validate_ticker(
        &state.pool,
        state.quote_provider.as_ref(),
        &ticker,
    )
    .await?;
    Ok(Json(json!({ "ticker": ticker, "valid": valid })))
}

async fn upsert_asset(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<UpsertAssetResult>, AppError> {
    info!("POST /market/assets/{}/upsert - Upserting asset", ticker);
    let result =
        market_data_service::upsert_asset(&state.pool, state.quote_provider.as_ref(), &ticker)
            .await
            .map_err(|e| {
                error!("Failed to upsert asset {}: {}", ticker, e);
                e
            })?;
    Ok(Json(result))
}

async fn batch_quotes(
    State(state): State<AppState>,
    Json(req): Json<BatchQuotesRequest>,
) -> Result<Json<Vec<MarketData>>, AppError> {
    info!("POST /market/batch/quotes - {} tickers", req.tickers.len());
    if req.tickers.is_empty() {
        return Err(AppError::Validation("No tickers provided".into()));
    }
    let quotes = market_data_service::get_batch_quotes(
        &state.pool,
        state.quote_provider.as_ref(),
        &req.tickers,
    )
    .await;
    Ok(Json(quotes))
}

async fn batch_update(
    State(state): State<AppState>,
    Json(req): Json<BatchUpdateRequest>,
) -> Result<Json<Vec<BatchUpdateOutcome>>, AppError> {
    info!("POST /market/batch/update - {} tickers", req.tickers.len());
    if req.tickers.is_empty() {
        return Err(AppError::Validation("No tickers provided".into()));
    }
    let outcomes = market_data_service::update_asset_prices(
        &state.pool,
        state.quote_provider.as_ref(),
        &req.tickers,
        req.update_history,
    )
    .await;
    Ok(Json(outcomes))
}
