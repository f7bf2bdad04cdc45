use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AssetHistory, HistoryBar};

const HISTORY_COLUMNS: &str = "id, asset_id, date, open_price, high_price, low_price,
                               close_price, volume, created_at";

/// The row for `asset_id` whose timestamp falls inside `[start, end)`, if any.
pub async fn fetch_in_range<'e, E>(
    executor: E,
    asset_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<AssetHistory>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, AssetHistory>(&format!(
        "SELECT {HISTORY_COLUMNS}
         FROM asset_history
         WHERE asset_id = $1 AND date >= $2 AND date < $3"
    ))
    .bind(asset_id)
    .bind(start)
    .bind(end)
    .fetch_optional(executor)
    .await
}

pub async fn update_bar<'e, E>(
    executor: E,
    id: Uuid,
    bar: &HistoryBar,
) -> Result<AssetHistory, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, AssetHistory>(&format!(
        "UPDATE asset_history
         SET open_price = $2, high_price = $3, low_price = $4,
             close_price = $5, volume = $6
         WHERE id = $1
         RETURNING {HISTORY_COLUMNS}"
    ))
    .bind(id)
    .bind(bar.open)
    .bind(bar.high)
    .bind(bar.low)
    .bind(bar.close)
    .bind(bar.volume)
    .fetch_one(executor)
    .await
}

pub async fn insert<'e, E>(
    executor: E,
    asset_id: Uuid,
    bar: &HistoryBar,
    date: DateTime<Utc>,
) -> Result<AssetHistory, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, AssetHistory>(&format!(
        "INSERT INTO asset_history (id, asset_id, date, open_price, high_price,
                                    low_price, close_price, volume)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {HISTORY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(asset_id)
    .bind(date)
    .bind(bar.open)
    .bind(bar.high)
    .bind(bar.low)
    .bind(bar.close)
    .bind(bar.volume)
    .fetch_one(executor)
    .await
}

pub async fn fetch_page(
    pool: &PgPool,
    asset_id: Uuid,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    page: i64,
    limit: i64,
) -> Result<(Vec<AssetHistory>, i64), sqlx::Error> {
    let rows = sqlx::query_as::<_, AssetHistory>(&format!(
        "SELECT {HISTORY_COLUMNS}
         FROM asset_history
         WHERE asset_id = $1
           AND ($2::timestamptz IS NULL OR date >= $2)
           AND ($3::timestamptz IS NULL OR date <= $3)
         ORDER BY date DESC
         LIMIT $4 OFFSET $5"
    ))
    .bind(asset_id)
    .bind(start)
    .bind(end)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*)
         FROM asset_history
         WHERE asset_id = $1
           AND ($2::timestamptz IS NULL OR date >= $2)
           AND ($3::timestamptz IS NULL OR date <= $3)",
    )
    .bind(asset_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn fetch_latest(
    pool: &PgPool,
    asset_id: Uuid,
) -> Result<Option<AssetHistory>, sqlx::Error> {
    sqlx::query_as::<_, AssetHistory>(&format!(
        "SELECT {HISTORY_COLUMNS}
         FROM asset_history
         WHERE asset_id = $1
         ORDER BY date DESC
         LIMIT 1"
    ))
    .bind(asset_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_since(
    pool: &PgPool,
    asset_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<AssetHistory>, sqlx::Error> {
    sqlx::query_as::<_, AssetHistory>(&format!(
        "SELECT {HISTORY_COLUMNS}
         FROM asset_history
         WHERE asset_id = $1 AND date >= $2
         ORDER BY date DESC"
    ))
    .bind(asset_id)
    .bind(since)
    .fetch_all(pool)
    .await
}
