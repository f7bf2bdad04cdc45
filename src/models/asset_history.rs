use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// One OHLCV record per asset per calendar day. The upsert path guarantees
// the (asset_id, day) uniqueness; `date` keeps the exact insertion timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssetHistory {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub date: DateTime<Utc>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    // Absent when the provider doesn't report volume; never synthesized.
    pub volume: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A single day's bar as written by the upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub data: Vec<AssetHistory>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct HistoryStats {
    pub asset_id: Uuid,
    pub period_days: i64,
    pub record_count: usize,
    pub latest_price: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub average_price: f64,
    pub total_volume: i64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub first_date: DateTime<Utc>,
    pub last_date: DateTime<Utc>,
}
