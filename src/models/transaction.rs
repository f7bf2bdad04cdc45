use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Buy,
    Sell,
    Deposit,
    Withdrawal,
    Dividend,
    Interest,
}

impl TransactionType {
    /// Cash inflows for cashflow analysis; everything else counts as spending.
    pub fn is_income(self) -> bool {
        matches!(
            self,
            TransactionType::Deposit | TransactionType::Dividend | TransactionType::Interest
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Buy => "buy",
            TransactionType::Sell => "sell",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Dividend => "dividend",
            TransactionType::Interest => "interest",
        }
    }
}

// Immutable ledger entry. Rows are only ever created; holding-changing
// operations append one as part of the same database transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub quantity: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub total_amount: f64,
    pub description: Option<String>,
    pub asset_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub quantity: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub total_amount: f64,
    pub description: Option<String>,
    pub asset_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CashflowSummary {
    pub period_days: i64,
    pub income: f64,
    pub spending: f64,
    pub net_cashflow: f64,
    pub transactions: Vec<Transaction>,
}

// One group in the by-asset-type cashflow breakdown. Transactions with no
// asset reference land in the "cash" group.
#[derive(Debug, Default, Serialize)]
pub struct AssetTypeCashflow {
    pub income: f64,
    pub spending: f64,
    pub net_cashflow: f64,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
pub struct CashflowByAssetType {
    pub period_days: i64,
    pub summary: CashflowSummary,
    pub by_asset_type: HashMap<String, AssetTypeCashflow>,
}

#[derive(Debug, Default, Serialize)]
pub struct TransactionBucket {
    pub count: usize,
    pub volume: f64,
}

#[derive(Debug, Serialize)]
pub struct TransactionStats {
    pub period_days: i64,
    pub total_transactions: usize,
    pub total_volume: f64,
    pub by_type: HashMap<String, TransactionBucket>,
    pub by_asset: HashMap<String, TransactionBucket>,
}
