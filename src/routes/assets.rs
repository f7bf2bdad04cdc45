use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Asset, AssetHistory, CreateAsset, HistoryPage, HistoryStats, UpdateAsset};
use crate::services;
use crate::services::asset_service::{HistoryQuery, PriceRefreshResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assets))
        .route("/", post(create_asset))
        .route("/search", get(search_assets))
        .route("/ticker/:ticker", get(get_asset_by_ticker))
        .route("/ticker/:ticker/refresh", post(refresh_price_by_ticker))
        .route("/ticker/:ticker/history", get(get_history_by_ticker))
        .route(
            "/ticker/:ticker/history/latest",
            get(get_latest_history_by_ticker),
        )
        .route("/:id", get(get_asset))
        .route("/:id", put(update_asset))
        .route("/:id", delete(delete_asset))
        .route("/:id/refresh", post(refresh_price))
        .route("/:id/history", get(get_history))
        .route("/:id/history/latest", get(get_latest_history))
        .route("/:id/history/stats", get(get_history_stats))
        .route("/:id/history/mock", post(generate_mock_history))
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Deserialize)]
struct DaysQuery {
    days: Option<i64>,
}

async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Asset>>, AppError> {
    info!("GET /assets - Listing assets");
    let assets = services::asset_service::list_assets(&state.pool, query.page, query.limit)
        .await
        .map_err(|e| {
            error!("Failed to list assets: {}", e);
            e
        })?;
    Ok(Json(assets))
}

async fn create_asset(
    State(state): State<AppState>,
    Json(input): Json<CreateAsset>,
) -> Result<(StatusCode, Json<Asset>), AppError> {
    info!("POST /assets - Creating asset {}", input.ticker);
    let asset =
        services::asset_service::create_asset(&state.pool, state.quote_provider.as_ref(), input)
            .await
            .map_err(|e| {
                error!("Failed to create asset: {}", e);
                e
            })?;
    Ok((StatusCode::CREATED, Json(asset)))
}

async fn search_assets(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Asset>>, AppError> {
    info!("GET /assets/search - Searching assets: {}", query.q);
    let assets = services::asset_service::search_assets(&state.pool, &query.q)
        .await
        .map_err(|e| {
            error!("Failed to search assets for '{}': {}", query.q, e);
            e
        })?;
    Ok(Json(assets))
}

async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Asset>, AppError> {
    info!("GET /assets/{} - Getting asset", id);
    let asset = services::asset_service::get_asset(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to get asset {}: {}", id, e);
            e
        })?;
    Ok(Json(asset))
}

async fn get_asset_by_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<Asset>, AppError> {
    info!("GET /assets/ticker/{} - Getting asset by ticker", ticker);
    let asset = services::asset_service::get_asset_by_ticker(&state.pool, &ticker)
        .await
        .map_err(|e| {
            error!("Failed to get asset by ticker {}: {}", ticker, e);
            e
        })?;
    Ok(Json(asset))
}

async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAsset>,
) -> Result<Json<Asset>, AppError> {
    info!("PUT /assets/{} - Updating asset", id);
    let asset = services::asset_service::update_asset(&state.pool, id, input)
        .await
        .map_err(|e| {
            error!("Failed to update asset {}: {}", id, e);
            e
        })?;
    Ok(Json(asset))
}

async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /assets/{} - Deleting asset", id);
    services::asset_service::delete_asset(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to delete asset {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PriceRefreshResult>, AppError> {
    info!("POST /assets/{}/refresh - Refreshing price", id);
    let result =
        services::asset_service::refresh_price(&state.pool, state.quote_provider.as_ref(), id)
            .await
            .map_err(|e| {
                error!("Failed to refresh price for asset {}: {}", id, e);
                e
            })?;
    Ok(Json(result))
}

async fn refresh_price_by_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<PriceRefreshResult>, AppError> {
    info!("POST /assets/ticker/{}/refresh - Refreshing price", ticker);
    let result = services::asset_service::refresh_price_by_ticker(
        &state.pool,
        state.quote_provider.as_ref(),
        &ticker,
    )
    .await
    .map_err(|e| {
        error!("Failed to refresh price for {}: {}", ticker, e);
        e
    })?;
    Ok(Json(result))
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, AppError> {
    info!("GET /assets/{}/history - Getting price history", id);
    let page = services::asset_service::get_history(&state.pool, id, query)
        .await
        .map_err(|e| {
            error!("Failed to get history for asset {}: {}", id, e);
            e
        })?;
    Ok(Json(page))
}

async fn get_history_by_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, AppError> {
    info!("GET /assets/ticker/{}/history - Getting price history", ticker);
    let page = services::asset_service::get_history_by_ticker(&state.pool, &ticker, query)
        .await
        .map_err(|e| {
            error!("Failed to get history for {}: {}", ticker, e);
            e
        })?;
    Ok(Json(page))
}

async fn get_latest_history_by_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<AssetHistory>, AppError> {
    info!(
        "GET /assets/ticker/{}/history/latest - Getting latest history",
        ticker
    );
    let latest = services::asset_service::get_latest_history_by_ticker(&state.pool, &ticker)
        .await
        .map_err(|e| {
            error!("Failed to get latest history for {}: {}", ticker, e);
            e
        })?;
    Ok(Json(latest))
}

async fn get_latest_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetHistory>, AppError> {
    info!("GET /assets/{}/history/latest - Getting latest history", id);
    let latest = services::asset_service::get_latest_history(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to get latest history for asset {}: {}", id, e);
            e
        })?;
    Ok(Json(latest))
}

async fn get_history_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<HistoryStats>, AppError> {
    let days = query.days.unwrap_or(30);
    info!("GET /assets/{}/history/stats - Getting {}d stats", id, days);
    let stats = services::asset_service::get_history_stats(&state.pool, id, days)
        .await
        .map_err(|e| {
            error!("Failed to get history stats for asset {}: {}", id, e);
            e
        })?;
    Ok(Json(stats))
}

async fn generate_mock_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DaysQuery>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let days = query.days.unwrap_or(30);
    info!("POST /assets/{}/history/mock - Generating {} days", id, days);
    let count = services::asset_service::generate_mock_history(&state.pool, id, days)
        .await
        .map_err(|e| {
            error!("Failed to generate mock history for asset {}: {}", id, e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(json!({ "records": count }))))
}
