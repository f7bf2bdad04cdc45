use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// A position in one asset within one account. Deleted outright when the
// quantity reaches zero; a zero-quantity row is never kept.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Holding {
    pub id: Uuid,
    pub account_id: Uuid,
    pub asset_id: Uuid,
    pub quantity: f64,
    pub average_cost_basis: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateHolding {
    pub account_id: Uuid,
    pub asset_id: Uuid,
    pub quantity: f64,
    pub average_cost_basis: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateHolding {
    pub quantity: Option<f64>,
    pub average_cost_basis: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub username: String,
    pub ticker: String,
    pub account_id: Uuid,
    pub quantity: f64,
    pub price: Option<f64>,
    pub transaction_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_market_price: bool,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub username: String,
    pub ticker: String,
    // Omitted quantity means "sell the entire position".
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BuyResult {
    pub holding: Holding,
    pub transaction: super::Transaction,
    pub price_used: f64,
}

#[derive(Debug, Serialize)]
pub struct SellResult {
    pub ticker: String,
    pub quantity: f64,
    pub sell_price: f64,
    pub total_amount: f64,
    pub is_full_sell: bool,
    pub remaining_holding: Option<Holding>,
    pub transaction: super::Transaction,
}
