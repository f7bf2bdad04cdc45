use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::AssetType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// One portfolio per user; accounts hang off it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

// Point-in-time valuation of a whole portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioSnapshot {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub snapshot_date: DateTime<Utc>,
    pub total_value: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PortfolioSummary {
    pub id: Uuid,
    pub name: String,
    pub currency: String,
    pub total_value: f64,
    pub cash_value: f64,
    pub investment_value: f64,
    pub accounts: Vec<AccountSummary>,
}

#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub institution_name: String,
    pub account_name: String,
    pub account_type: String,
    pub balance_current: f64,
    pub holdings: Vec<HoldingSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingSummary {
    pub id: Uuid,
    pub ticker: String,
    pub name: String,
    pub asset_type: AssetType,
    pub quantity: f64,
    pub average_cost_basis: f64,
    pub current_price: Option<f64>,
    pub market_value: f64,
    pub unrealized_gain_loss: f64,
    pub percent_change: f64,
}

#[derive(Debug, Serialize)]
pub struct TopPerformers {
    pub top_gainers: Vec<HoldingSummary>,
    pub top_losers: Vec<HoldingSummary>,
}
