use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CashflowByAssetType, CashflowSummary, CreateTransaction, Transaction, TransactionStats,
};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions))
        .route("/", post(create_transaction))
        .route("/account/:account_id", get(transactions_by_account))
        .route("/user/:username", get(transactions_by_username))
        .route("/user/:username/cashflow", get(cashflow_analysis))
        .route(
            "/user/:username/cashflow/by-asset-type",
            get(cashflow_by_asset_type),
        )
        .route("/user/:username/stats", get(transaction_stats))
        .route("/:id", get(get_transaction))
        .route("/:id", delete(delete_transaction))
}

#[derive(Deserialize)]
struct CashflowQuery {
    days: Option<i64>,
}

async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    info!("GET /transactions - Listing transactions");
    let transactions = services::transaction_service::list_transactions(&state.pool)
        .await
        .map_err(|e| {
            error!("Failed to list transactions: {}", e);
            e
        })?;
    Ok(Json(transactions))
}

async fn create_transaction(
    State(state): State<AppState>,
    Json(input): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    info!("POST /transactions - Recording transaction");
    let transaction = services::transaction_service::create_transaction(&state.pool, input)
        .await
        .map_err(|e| {
            error!("Failed to create transaction: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    info!("GET /transactions/{} - Getting transaction", id);
    let transaction = services::transaction_service::get_transaction(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to get transaction {}: {}", id, e);
            e
        })?;
    Ok(Json(transaction))
}

async fn transactions_by_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    info!("GET /transactions/account/{} - Getting transactions", account_id);
    let transactions =
        services::transaction_service::transactions_by_account(&state.pool, account_id)
            .await
            .map_err(|e| {
                error!("Failed to get transactions for account {}: {}", account_id, e);
                e
            })?;
    Ok(Json(transactions))
}

async fn transactions_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    info!("GET /transactions/user/{} - Getting transactions", username);
    let transactions =
        services::transaction_service::transactions_by_username(&state.pool, &username)
            .await
            .map_err(|e| {
                error!("Failed to get transactions for user {}: {}", username, e);
                e
            })?;
    Ok(Json(transactions))
}

async fn cashflow_analysis(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<CashflowQuery>,
) -> Result<Json<CashflowSummary>, AppError> {
    let days = query.days.unwrap_or(30);
    info!(
        "GET /transactions/user/{}/cashflow - {}d cashflow",
        username, days
    );
    let summary = services::transaction_service::cashflow_analysis(&state.pool, &username, days)
        .await
        .map_err(|e| {
            error!("Failed to analyze cashflow for {}: {}", username, e);
            e
        })?;
    Ok(Json(summary))
}

async fn cashflow_by_asset_type(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<CashflowQuery>,
) -> Result<Json<CashflowByAssetType>, AppError> {
    let days = query.days.unwrap_or(30);
    info!(
        "GET /transactions/user/{}/cashflow/by-asset-type - {}d",
        username, days
    );
    let breakdown =
        services::transaction_service::cashflow_by_asset_type(&state.pool, &username, days)
            .await
            .map_err(|e| {
                error!("Failed to group cashflow for {}: {}", username, e);
                e
            })?;
    Ok(Json(breakdown))
}

async fn transaction_stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<CashflowQuery>,
) -> Result<Json<TransactionStats>, AppError> {
    let days = query.days.unwrap_or(30);
    info!(
        "GET /transactions/user/{}/stats - {}d stats",
        username, days
    );
    let stats = services::transaction_service::transaction_stats(&state.pool, &username, days)
        .await
        .map_err(|e| {
            error!("Failed to get transaction stats for {}: {}", username, e);
            e
        })?;
    Ok(Json(stats))
}

async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /transactions/{} - Deleting transaction", id);
    services::transaction_service::delete_transaction(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to delete transaction {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
