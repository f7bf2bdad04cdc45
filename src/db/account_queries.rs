use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Account;

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, portfolio_id, institution_name, account_name, account_type,
                balance_current, balance_updated_at, created_at
         FROM accounts
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_portfolio(
    pool: &PgPool,
    portfolio_id: Uuid,
) -> Result<Vec<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, portfolio_id, institution_name, account_name, account_type,
                balance_current, balance_updated_at, created_at
         FROM accounts
         WHERE portfolio_id = $1
         ORDER BY created_at ASC",
    )
    .bind(portfolio_id)
    .fetch_all(pool)
    .await
}

// The oldest account doubles as the default when a caller doesn't name one.
pub async fn fetch_default(
    pool: &PgPool,
    portfolio_id: Uuid,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, portfolio_id, institution_name, account_name, account_type,
                balance_current, balance_updated_at, created_at
         FROM accounts
         WHERE portfolio_id = $1
         ORDER BY created_at ASC
         LIMIT 1",
    )
    .bind(portfolio_id)
    .fetch_optional(pool)
    .await
}
