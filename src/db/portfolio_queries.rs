use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Portfolio, PortfolioSnapshot};

pub async fn fetch_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(
        "SELECT id, user_id, name, currency, created_at
         FROM portfolios
         WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(
        "SELECT p.id, p.user_id, p.name, p.currency, p.created_at
         FROM portfolios p
         JOIN users u ON u.id = p.user_id
         WHERE u.username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_snapshots(
    pool: &PgPool,
    portfolio_id: Uuid,
    days: i64,
) -> Result<Vec<PortfolioSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioSnapshot>(
        "SELECT id, portfolio_id, snapshot_date, total_value, created_at
         FROM portfolio_snapshots
         WHERE portfolio_id = $1
         ORDER BY snapshot_date DESC
         LIMIT $2",
    )
    .bind(portfolio_id)
    .bind(days)
    .fetch_all(pool)
    .await
    .map(|mut rows| {
        // Oldest first for chart rendering
        rows.reverse();
        rows
    })
}
