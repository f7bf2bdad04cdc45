use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "asset_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Stock,
    Etf,
    Option,
    MutualFund,
    Crypto,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Etf => "etf",
            AssetType::Option => "option",
            AssetType::MutualFund => "mutual_fund",
            AssetType::Crypto => "crypto",
        }
    }

    /// Heuristic used when the caller doesn't specify a type.
    pub fn from_ticker(ticker: &str) -> Self {
        let upper = ticker.to_uppercase();
        if upper.contains("ETF") {
            AssetType::Etf
        } else if upper.contains("OPT") {
            AssetType::Option
        } else {
            AssetType::Stock
        }
    }
}

// A tradable asset known to the system. Price fields stay NULL until the
// first successful quote fetch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: Uuid,
    pub ticker: String,
    pub name: String,
    pub asset_type: AssetType,
    pub current_price: Option<f64>,
    pub percent_change_today: Option<f64>,
    pub price_updated_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAsset {
    pub ticker: String,
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
    pub price: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateAsset {
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
    pub price: Option<f64>,
}
