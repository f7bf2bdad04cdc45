use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CreateTransaction, Transaction};

const TX_COLUMNS: &str = "id, account_id, transaction_type, transaction_date, quantity,
                          price_per_unit, total_amount, description, asset_id, created_at";

pub async fn insert<'e, E>(
    executor: E,
    input: &CreateTransaction,
) -> Result<Transaction, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Transaction>(&format!(
        "INSERT INTO transactions (id, account_id, transaction_type, transaction_date,
                                   quantity, price_per_unit, total_amount, description, asset_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {TX_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(input.account_id)
    .bind(input.transaction_type)
    .bind(input.transaction_date)
    .bind(input.quantity)
    .bind(input.price_per_unit)
    .bind(input.total_amount)
    .bind(input.description.as_deref())
    .bind(input.asset_id)
    .fetch_one(executor)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TX_COLUMNS} FROM transactions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TX_COLUMNS} FROM transactions ORDER BY transaction_date DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TX_COLUMNS} FROM transactions
         WHERE account_id = $1
         ORDER BY transaction_date DESC"
    ))
    .bind(account_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT t.id, t.account_id, t.transaction_type, t.transaction_date, t.quantity,
                t.price_per_unit, t.total_amount, t.description, t.asset_id, t.created_at
         FROM transactions t
         JOIN accounts a ON a.id = t.account_id
         JOIN portfolios p ON p.id = a.portfolio_id
         JOIN users u ON u.id = p.user_id
         WHERE u.username = $1
         ORDER BY t.transaction_date DESC",
    )
    .bind(username)
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_username_since(
    pool: &PgPool,
    username: &str,
    since: DateTime<Utc>,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT t.id, t.account_id, t.transaction_type, t.transaction_date, t.quantity,
                t.price_per_unit, t.total_amount, t.description, t.asset_id, t.created_at
         FROM transactions t
         JOIN accounts a ON a.id = t.account_id
         JOIN portfolios p ON p.id = a.portfolio_id
         JOIN users u ON u.id = p.user_id
         WHERE u.username = $1 AND t.transaction_date >= $2
         ORDER BY t.transaction_date DESC",
    )
    .bind(username)
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
