use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Asset, AssetType};

const ASSET_COLUMNS: &str = "id, ticker, name, asset_type, current_price, percent_change_today,
                             price_updated_at, last_updated, currency, created_at";

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(&format!(
        "SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_ticker(pool: &PgPool, ticker: &str) -> Result<Option<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(&format!(
        "SELECT {ASSET_COLUMNS} FROM assets WHERE ticker = $1"
    ))
    .bind(ticker)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_page(pool: &PgPool, page: i64, limit: i64) -> Result<Vec<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(&format!(
        "SELECT {ASSET_COLUMNS} FROM assets ORDER BY ticker ASC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(pool)
    .await
}

pub async fn search(pool: &PgPool, query: &str) -> Result<Vec<Asset>, sqlx::Error> {
    let pattern = format!("%{}%", query);
    sqlx::query_as::<_, Asset>(&format!(
        "SELECT {ASSET_COLUMNS} FROM assets
         WHERE name ILIKE $1 OR ticker ILIKE $1
         ORDER BY name ASC"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    pool: &PgPool,
    ticker: &str,
    name: &str,
    asset_type: AssetType,
    current_price: Option<f64>,
    percent_change_today: Option<f64>,
    price_updated_at: Option<DateTime<Utc>>,
    currency: &str,
) -> Result<Asset, sqlx::Error> {
    sqlx::query_as::<_, Asset>(&format!(
        "INSERT INTO assets (id, ticker, name, asset_type, current_price,
                             percent_change_today, price_updated_at, last_updated, currency)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8)
         RETURNING {ASSET_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(ticker)
    .bind(name)
    .bind(asset_type)
    .bind(current_price)
    .bind(percent_change_today)
    .bind(price_updated_at)
    .bind(currency)
    .fetch_one(pool)
    .await
}

pub async fn update_fields(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    asset_type: Option<AssetType>,
    price: Option<f64>,
) -> Result<Option<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(&format!(
        "UPDATE assets
         SET name = COALESCE($2, name),
             asset_type = COALESCE($3, asset_type),
             current_price = COALESCE($4, current_price),
             price_updated_at = CASE WHEN $4 IS NOT NULL THEN now() ELSE price_updated_at END
         WHERE id = $1
         RETURNING {ASSET_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(asset_type)
    .bind(price)
    .fetch_optional(pool)
    .await
}

/// Price-only update, used by bulk refreshes that skip history writes.
pub async fn update_price<'e, E>(
    executor: E,
    id: Uuid,
    current_price: f64,
    percent_change_today: f64,
    now: DateTime<Utc>,
) -> Result<Option<Asset>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Asset>(&format!(
        "UPDATE assets
         SET current_price = $2,
             percent_change_today = $3,
             price_updated_at = $4,
             last_updated = $4
         WHERE id = $1
         RETURNING {ASSET_COLUMNS}"
    ))
    .bind(id)
    .bind(current_price)
    .bind(percent_change_today)
    .bind(now)
    .fetch_optional(executor)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn upsert_market_data<'e, E>(
    executor: E,
    ticker: &str,
    name: &str,
    asset_type: AssetType,
    current_price: f64,
    percent_change_today: f64,
    currency: &str,
    now: DateTime<Utc>,
) -> Result<Asset, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Asset>(&format!(
        "INSERT INTO assets (id, ticker, name, asset_type, current_price,
                             percent_change_today, price_updated_at, last_updated, currency)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8)
         ON CONFLICT (ticker) DO UPDATE SET
             name = EXCLUDED.name,
             current_price = EXCLUDED.current_price,
             percent_change_today = EXCLUDED.percent_change_today,
             price_updated_at = EXCLUDED.price_updated_at,
             last_updated = EXCLUDED.last_updated,
             currency = EXCLUDED.currency
         RETURNING {ASSET_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(ticker)
    .bind(name)
    .bind(asset_type)
    .bind(current_price)
    .bind(percent_change_today)
    .bind(now)
    .bind(currency)
    .fetch_one(executor)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Referencing holdings + transactions; deletion requires both at zero.
pub async fn count_references(pool: &PgPool, id: Uuid) -> Result<(i64, i64), sqlx::Error> {
    let (holdings,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM holdings WHERE asset_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
    let (transactions,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE asset_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok((holdings, transactions))
}
