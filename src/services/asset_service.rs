use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::OnceLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::external::quote_provider::QuoteProvider;
use crate::models::{
    Asset, AssetHistory, AssetType, CreateAsset, HistoryBar, HistoryPage, HistoryStats,
    UpdateAsset,
};
use crate::services::market_data_service;

const DEFAULT_PAGE_LIMIT: i64 = 10;
const MAX_PAGE_LIMIT: i64 = 200;

fn ticker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9.\-]{1,12}$").unwrap())
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct PriceRefreshResult {
    pub asset: Asset,
    pub history: AssetHistory,
    pub history_created: bool,
}

/// Calendar-day boundary for a timestamp: `[midnight, midnight + 1 day)` in UTC.
pub fn day_bounds(date: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
    (start, start + Duration::days(1))
}

fn clamp_page(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

/// One history row per asset per calendar day: an existing row inside the
/// day boundary is overwritten, otherwise a new row is stamped with the
/// exact timestamp. Runs inside the caller's transaction so the asset
/// update and the history write commit or roll back together.
pub async fn upsert_history(
    tx: &mut Transaction<'_, Postgres>,
    asset_id: Uuid,
    bar: &HistoryBar,
    date: DateTime<Utc>,
) -> Result<(AssetHistory, bool), AppError> {
    let (start, end) = day_bounds(date);

    let existing = db::asset_history_queries::fetch_in_range(&mut **tx, asset_id, start, end).await?;

    match existing {
        Some(row) => {
            let updated = db::asset_history_queries::update_bar(&mut **tx, row.id, bar).await?;
            debug!(
                "Updated existing history record for asset {} on {}",
                asset_id,
                start.date_naive()
            );
            Ok((updated, false))
        }
        None => {
            let inserted = db::asset_history_queries::insert(&mut **tx, asset_id, bar, date).await?;
            debug!(
                "Created new history record for asset {} on {}",
                asset_id,
                start.date_naive()
            );
            Ok((inserted, true))
        }
    }
}

/// Fresh detailed quote, then asset price update + history upsert as one
/// atomic unit.
pub async fn update_price_with_history(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    asset_id: Uuid,
    ticker: &str,
    cached_name: Option<&str>,
) -> Result<PriceRefreshResult, AppError> {
    let detailed =
        market_data_service::get_detailed_asset_data(provider, ticker, cached_name).await?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;
    let asset = db::asset_queries::update_price(
        &mut *tx,
        asset_id,
        detailed.current_price,
        detailed.percent_change,
        now,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Asset with ID {asset_id} not found")))?;

    let bar = market_data_service::bar_from_detailed(&detailed);
    let (history, is_new) = upsert_history(&mut tx, asset_id, &bar, now).await?;
    tx.commit().await?;

    Ok(PriceRefreshResult {
        asset,
        history,
        history_created: is_new,
    })
}

pub async fn create_asset(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    input: CreateAsset,
) -> Result<Asset, AppError> {
    let ticker = input.ticker.trim().to_uppercase();
    if !ticker_pattern().is_match(&ticker) {
        return Err(AppError::Validation(format!(
            "Malformed ticker: {}",
            input.ticker
        )));
    }

    if !market_data_service::validate_ticker(pool, provider, &ticker).await? {
        return Err(AppError::Validation(format!("Invalid ticker: {ticker}")));
    }

    let market_data = market_data_service::get_asset_data(pool, provider, &ticker).await?;
    let asset_type = input
        .asset_type
        .unwrap_or_else(|| AssetType::from_ticker(&ticker));
    let name = input.name.unwrap_or(market_data.name);
    let price = input.price.or(Some(market_data.current_price));

    db::asset_queries::insert(
        pool,
        &ticker,
        &name,
        asset_type,
        price,
        Some(market_data.percent_change),
        Some(Utc::now()),
        &market_data.currency,
    )
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => {
            AppError::Validation(format!("Asset with ticker {ticker} already exists"))
        }
        _ => AppError::Db(e),
    })
}

pub async fn list_assets(
    pool: &PgPool,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<Asset>, AppError> {
    let (page, limit) = clamp_page(page, limit, DEFAULT_PAGE_LIMIT);
    Ok(db::asset_queries::fetch_page(pool, page, limit).await?)
}

pub async fn get_asset(pool: &PgPool, id: Uuid) -> Result<Asset, AppError> {
    db::asset_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset with ID {id} not found")))
}

pub async fn get_asset_by_ticker(pool: &PgPool, ticker: &str) -> Result<Asset, AppError> {
    db::asset_queries::fetch_by_ticker(pool, ticker)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset with ticker {ticker} not found")))
}

pub async fn search_assets(pool: &PgPool, query: &str) -> Result<Vec<Asset>, AppError> {
    if query.trim().is_empty() {
        return Err(AppError::Validation("Search query cannot be empty".into()));
    }
    Ok(db::asset_queries::search(pool, query.trim()).await?)
}

pub async fn update_asset(pool: &PgPool, id: Uuid, input: UpdateAsset) -> Result<Asset, AppError> {
    if let Some(price) = input.price {
        if price <= 0.0 {
            return Err(AppError::Validation("Price must be > 0".into()));
        }
    }
    db::asset_queries::update_fields(pool, id, input.name.as_deref(), input.asset_type, input.price)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset with ID {id} not found")))
}

/// Deletion requires zero referencing holdings and transactions; this is an
/// explicit check, not a cascade.
pub async fn delete_asset(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let asset = get_asset(pool, id).await?;

    let (holdings, transactions) = db::asset_queries::count_references(pool, id).await?;
    if holdings > 0 || transactions > 0 {
        return Err(AppError::Validation(format!(
            "Cannot delete asset {} because it has {} holdings and {} transactions referencing it",
            asset.ticker, holdings, transactions
        )));
    }

    let deleted = db::asset_queries::delete(pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Asset with ID {id} not found")));
    }
    info!("Deleted asset {}", asset.ticker);
    Ok(())
}

pub async fn refresh_price(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    id: Uuid,
) -> Result<PriceRefreshResult, AppError> {
    let asset = get_asset(pool, id).await?;
    let result =
        update_price_with_history(pool, provider, asset.id, &asset.ticker, Some(&asset.name))
            .await?;
    info!(
        "Price refreshed for asset {}: {:?}",
        asset.ticker, result.asset.current_price
    );
    Ok(result)
}

pub async fn refresh_price_by_ticker(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    ticker: &str,
) -> Result<PriceRefreshResult, AppError> {
    let asset = get_asset_by_ticker(pool, ticker).await?;
    refresh_price(pool, provider, asset.id).await
}

pub async fn get_history(
    pool: &PgPool,
    id: Uuid,
    query: HistoryQuery,
) -> Result<HistoryPage, AppError> {
    // 404 for unknown assets rather than an empty page
    get_asset(pool, id).await?;

    let (page, limit) = clamp_page(query.page, query.limit, 30);
    let (data, total) =
        db::asset_history_queries::fetch_page(pool, id, query.start_date, query.end_date, page, limit)
            .await?;

    Ok(HistoryPage {
        data,
        page,
        limit,
        total,
        total_pages: (total + limit - 1) / limit,
    })
}

pub async fn get_history_by_ticker(
    pool: &PgPool,
    ticker: &str,
    query: HistoryQuery,
) -> Result<HistoryPage, AppError> {
    let asset = get_asset_by_ticker(pool, ticker).await?;
    get_history(pool, asset.id, query).await
}

pub async fn get_latest_history_by_ticker(
    pool: &PgPool,
    ticker: &str,
) -> Result<AssetHistory, AppError> {
    let asset = get_asset_by_ticker(pool, ticker).await?;
    get_latest_history(pool, asset.id).await
}

pub async fn get_latest_history(pool: &PgPool, id: Uuid) -> Result<AssetHistory, AppError> {
    get_asset(pool, id).await?;
    db::asset_history_queries::fetch_latest(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No history found for asset with ID {id}")))
}

pub async fn get_history_stats(
    pool: &PgPool,
    id: Uuid,
    days: i64,
) -> Result<HistoryStats, AppError> {
    get_asset(pool, id).await?;

    let since = Utc::now() - Duration::days(days);
    let history = db::asset_history_queries::fetch_since(pool, id, since).await?;

    if history.is_empty() {
        return Err(AppError::NotFound(format!(
            "No history found for asset with ID {id} in the last {days} days"
        )));
    }

    // history is ordered newest first
    let prices: Vec<f64> = history.iter().map(|h| h.close_price).collect();
    let latest = prices[0];
    let oldest = prices[prices.len() - 1];
    let total_volume: i64 = history.iter().filter_map(|h| h.volume).sum();

    Ok(HistoryStats {
        asset_id: id,
        period_days: days,
        record_count: history.len(),
        latest_price: latest,
        highest_price: prices.iter().cloned().fold(f64::MIN, f64::max),
        lowest_price: prices.iter().cloned().fold(f64::MAX, f64::min),
        average_price: prices.iter().sum::<f64>() / prices.len() as f64,
        total_volume,
        price_change: latest - oldest,
        price_change_percent: if oldest != 0.0 {
            (latest - oldest) / oldest * 100.0
        } else {
            0.0
        },
        first_date: history[history.len() - 1].date,
        last_date: history[0].date,
    })
}

/// Dev helper: seeds a random-walk history for an asset through the same
/// upsert path the real refresh uses.
pub async fn generate_mock_history(
    pool: &PgPool,
    id: Uuid,
    days: i64,
) -> Result<usize, AppError> {
    get_asset(pool, id).await?;

    let today = Utc::now();
    let mut close = 100.0_f64;
    let mut tx = pool.begin().await?;

    for i in 0..days {
        close *= 1.0 + (rand::random::<f64>() - 0.5) * 0.02;
        let spread = close * 0.01;
        let bar = HistoryBar {
            open: close - spread / 2.0,
            high: close + spread,
            low: close - spread,
            close,
            volume: Some((rand::random::<f64>() * 1_000_000.0) as i64 + 100_000),
        };
        upsert_history(&mut tx, id, &bar, today - Duration::days(i)).await?;
    }

    tx.commit().await?;
    Ok(days as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let date = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 45).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());
        assert!(start <= date && date < end);
    }

    #[test]
    fn day_bounds_at_midnight_belong_to_that_day() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let (start, end) = day_bounds(midnight);
        assert_eq!(start, midnight);
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn two_timestamps_same_day_share_bounds() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap();
        assert_eq!(day_bounds(morning), day_bounds(evening));
    }

    #[test]
    fn page_clamping() {
        assert_eq!(clamp_page(None, None, 10), (1, 10));
        assert_eq!(clamp_page(Some(0), Some(0), 10), (1, 1));
        assert_eq!(clamp_page(Some(3), Some(500), 10), (3, MAX_PAGE_LIMIT));
    }

    #[test]
    fn ticker_format() {
        assert!(ticker_pattern().is_match("AAPL"));
        assert!(ticker_pattern().is_match("BRK.B"));
        assert!(ticker_pattern().is_match("BTC-USD"));
        assert!(!ticker_pattern().is_match(""));
        assert!(!ticker_pattern().is_match("NOT A TICKER"));
        assert!(!ticker_pattern().is_match("WAYTOOLONGTICKER"));
    }
}
