use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{BuyRequest, BuyResult, CreateHolding, Holding, SellRequest, SellResult, UpdateHolding};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_holdings))
        .route("/", post(create_holding))
        .route("/buy", post(buy))
        .route("/sell", post(sell))
        .route("/account/:account_id", get(holdings_by_account))
        .route("/user/:username", get(holdings_by_username))
        .route("/:id", get(get_holding))
        .route("/:id", put(update_holding))
        .route("/:id", delete(delete_holding))
        .route("/:id/sell", post(sell_position))
}

#[derive(Deserialize)]
struct SellPositionRequest {
    quantity: Option<f64>,
    price: Option<f64>,
}

async fn buy(
    State(state): State<AppState>,
    Json(req): Json<BuyRequest>,
) -> Result<(StatusCode, Json<BuyResult>), AppError> {
    info!(
        "POST /holdings/buy - {} buying {} {}",
        req.username, req.quantity, req.ticker
    );
    let result = services::holding_service::buy(&state.pool, state.quote_provider.as_ref(), req)
        .await
        .map_err(|e| {
            error!("Buy failed: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn sell(
    State(state): State<AppState>,
    Json(req): Json<SellRequest>,
) -> Result<Json<SellResult>, AppError> {
    info!(
        "POST /holdings/sell - {} selling {:?} {}",
        req.username, req.quantity, req.ticker
    );
    let result = services::holding_service::sell(&state.pool, state.quote_provider.as_ref(), req)
        .await
        .map_err(|e| {
            error!("Sell failed: {}", e);
            e
        })?;
    Ok(Json(result))
}

async fn sell_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SellPositionRequest>,
) -> Result<Json<SellResult>, AppError> {
    info!("POST /holdings/{}/sell - Selling position", id);
    let result = services::holding_service::sell_position(
        &state.pool,
        state.quote_provider.as_ref(),
        id,
        req.quantity,
        req.price,
    )
    .await
    .map_err(|e| {
        error!("Failed to sell holding {}: {}", id, e);
        e
    })?;
    Ok(Json(result))
}

async fn list_holdings(State(state): State<AppState>) -> Result<Json<Vec<Holding>>, AppError> {
    info!("GET /holdings - Listing holdings");
    let holdings = services::holding_service::list_holdings(&state.pool)
        .await
        .map_err(|e| {
            error!("Failed to list holdings: {}", e);
            e
        })?;
    Ok(Json(holdings))
}

async fn create_holding(
    State(state): State<AppState>,
    Json(input): Json<CreateHolding>,
) -> Result<(StatusCode, Json<Holding>), AppError> {
    info!("POST /holdings - Creating holding");
    let holding = services::holding_service::create_holding(&state.pool, input)
        .await
        .map_err(|e| {
            error!("Failed to create holding: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(holding)))
}

async fn get_holding(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Holding>, AppError> {
    info!("GET /holdings/{} - Getting holding", id);
    let holding = services::holding_service::get_holding(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to get holding {}: {}", id, e);
            e
        })?;
    Ok(Json(holding))
}

async fn holdings_by_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<Holding>>, AppError> {
    info!("GET /holdings/account/{} - Getting holdings", account_id);
    let holdings = services::holding_service::holdings_by_account(&state.pool, account_id)
        .await
        .map_err(|e| {
            error!("Failed to get holdings for account {}: {}", account_id, e);
            e
        })?;
    Ok(Json(holdings))
}

async fn holdings_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Holding>>, AppError> {
    info!("GET /holdings/user/{} - Getting holdings", username);
    let holdings = services::holding_service::holdings_by_username(&state.pool, &username)
        .await
        .map_err(|e| {
            error!("Failed to get holdings for user {}: {}", username, e);
            e
        })?;
    Ok(Json(holdings))
}

async fn update_holding(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateHolding>,
) -> Result<Json<Holding>, AppError> {
    info!("PUT /holdings/{} - Updating holding", id);
    let holding = services::holding_service::update_holding(&state.pool, id, input)
        .await
        .map_err(|e| {
            error!("Failed to update holding {}: {}", id, e);
            e
        })?;
    Ok(Json(holding))
}

async fn delete_holding(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /holdings/{} - Deleting holding", id);
    services::holding_service::delete_holding(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to delete holding {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
