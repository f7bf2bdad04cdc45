use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// An account inside a portfolio (e.g. a brokerage account or a checking
// account). "depository" accounts count as cash in portfolio summaries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub institution_name: String,
    pub account_name: String,
    pub account_type: String,
    pub balance_current: f64,
    pub balance_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
