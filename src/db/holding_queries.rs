use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Holding, UpdateHolding};

const HOLDING_COLUMNS: &str = "id, account_id, asset_id, quantity, average_cost_basis, created_at";

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {HOLDING_COLUMNS} FROM holdings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {HOLDING_COLUMNS} FROM holdings ORDER BY created_at ASC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_account(pool: &PgPool, account_id: Uuid) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {HOLDING_COLUMNS} FROM holdings WHERE account_id = $1 ORDER BY created_at ASC"
    ))
    .bind(account_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_username(pool: &PgPool, username: &str) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(
        "SELECT h.id, h.account_id, h.asset_id, h.quantity, h.average_cost_basis, h.created_at
         FROM holdings h
         JOIN accounts a ON a.id = h.account_id
         JOIN portfolios p ON p.id = a.portfolio_id
         JOIN users u ON u.id = p.user_id
         WHERE u.username = $1
         ORDER BY h.created_at ASC",
    )
    .bind(username)
    .fetch_all(pool)
    .await
}

pub async fn fetch_pair<'e, E>(
    executor: E,
    account_id: Uuid,
    asset_id: Uuid,
) -> Result<Option<Holding>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {HOLDING_COLUMNS} FROM holdings WHERE account_id = $1 AND asset_id = $2"
    ))
    .bind(account_id)
    .bind(asset_id)
    .fetch_optional(executor)
    .await
}

/// Row-locked read used inside sell transactions: two racing sells serialize
/// here, so the quantity check always sees the committed quantity.
pub async fn fetch_pair_for_update<'e, E>(
    executor: E,
    account_id: Uuid,
    asset_id: Uuid,
) -> Result<Option<Holding>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {HOLDING_COLUMNS} FROM holdings
         WHERE account_id = $1 AND asset_id = $2
         FOR UPDATE"
    ))
    .bind(account_id)
    .bind(asset_id)
    .fetch_optional(executor)
    .await
}

pub async fn fetch_one_for_update<'e, E>(
    executor: E,
    id: Uuid,
) -> Result<Option<Holding>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {HOLDING_COLUMNS} FROM holdings WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert<'e, E>(
    executor: E,
    account_id: Uuid,
    asset_id: Uuid,
    quantity: f64,
    average_cost_basis: f64,
) -> Result<Holding, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Holding>(&format!(
        "INSERT INTO holdings (id, account_id, asset_id, quantity, average_cost_basis)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {HOLDING_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(account_id)
    .bind(asset_id)
    .bind(quantity)
    .bind(average_cost_basis)
    .fetch_one(executor)
    .await
}

pub async fn update_position<'e, E>(
    executor: E,
    id: Uuid,
    quantity: f64,
    average_cost_basis: f64,
) -> Result<Holding, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Holding>(&format!(
        "UPDATE holdings
         SET quantity = $2, average_cost_basis = $3
         WHERE id = $1
         RETURNING {HOLDING_COLUMNS}"
    ))
    .bind(id)
    .bind(quantity)
    .bind(average_cost_basis)
    .fetch_one(executor)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    input: UpdateHolding,
) -> Result<Option<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "UPDATE holdings
         SET quantity = COALESCE($2, quantity),
             average_cost_basis = COALESCE($3, average_cost_basis)
         WHERE id = $1
         RETURNING {HOLDING_COLUMNS}"
    ))
    .bind(id)
    .bind(input.quantity)
    .bind(input.average_cost_basis)
    .fetch_optional(pool)
    .await
}

pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM holdings WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
