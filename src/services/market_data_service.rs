use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use crate::db;
use crate::errors::AppError;
use crate::external::quote_provider::{QuoteProvider, QuoteProviderError};
use crate::models::{Asset, AssetType, HistoryBar};
use crate::services::asset_service;

/// Cached quotes younger than this are served without an external call.
pub const PRICE_STALE_AFTER_SECS: i64 = 60 * 60;

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Serialize)]
pub struct MarketData {
    pub ticker: String,
    pub name: String,
    pub current_price: f64,
    pub percent_change: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedMarketData {
    pub ticker: String,
    pub name: String,
    pub current_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub previous_close: f64,
    pub percent_change: f64,
    pub volume: Option<i64>,
    pub timestamp: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct UpsertAssetResult {
    #[serde(flatten)]
    pub asset: Asset,
    pub history_updated: bool,
    pub history_created: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchUpdateOutcome {
    pub ticker: String,
    pub success: bool,
    pub error: Option<String>,
}

pub fn is_price_fresh(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match updated_at {
        Some(t) => (now - t).num_seconds() < PRICE_STALE_AFTER_SECS,
        None => false,
    }
}

fn market_data_from_cache(ticker: &str, asset: &Asset, price: f64) -> MarketData {
    MarketData {
        ticker: ticker.to_string(),
        name: asset.name.clone(),
        current_price: price,
        percent_change: asset.percent_change_today.unwrap_or(0.0),
        currency: asset.currency.clone(),
    }
}

/// Company name with graceful degradation: profile lookup failure falls back
/// to the ticker itself rather than failing the quote.
async fn resolve_company_name(provider: &dyn QuoteProvider, ticker: &str) -> (String, String) {
    match provider.fetch_company_profile(ticker).await {
        Ok(profile) => {
            let currency = profile
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
            (profile.name, currency)
        }
        Err(e) => {
            warn!("Failed to get company name for {}: {}", ticker, e);
            (ticker.to_string(), DEFAULT_CURRENCY.to_string())
        }
    }
}

/// Quote with the 1-hour cache policy: fresh cache is served as-is, a stale
/// cache is only used as a fallback when the provider call fails.
pub async fn get_asset_data(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    ticker: &str,
) -> Result<MarketData, AppError> {
    let cached = db::asset_queries::fetch_by_ticker(pool, ticker).await?;
    let now = Utc::now();

    if let Some(asset) = &cached {
        if let Some(price) = asset.current_price {
            if is_price_fresh(asset.price_updated_at, now) {
                debug!(
                    "Using cached data for {}, updated {:?}",
                    ticker, asset.price_updated_at
                );
                return Ok(market_data_from_cache(ticker, asset, price));
            }
        }
    }

    match provider.fetch_quote(ticker).await {
        Ok(quote) => {
            // Reuse the cached company name to skip the profile lookup
            let (name, currency) = match cached.as_ref() {
                Some(asset) => (asset.name.clone(), asset.currency.clone()),
                None => resolve_company_name(provider, ticker).await,
            };
            Ok(MarketData {
                ticker: ticker.to_string(),
                name,
                current_price: quote.current,
                percent_change: quote.percent_change,
                currency,
            })
        }
        Err(e) => {
            if let Some(asset) = &cached {
                if let Some(price) = asset.current_price {
                    warn!("Provider failed for {}, using stale cached data", ticker);
                    return Ok(market_data_from_cache(ticker, asset, price));
                }
            }
            error!("Failed to fetch quote for {}: {}", ticker, e);
            Err(AppError::UpstreamUnavailable(format!(
                "Failed to fetch data for {ticker}: {e}"
            )))
        }
    }
}

/// Always calls the provider, never the cache. Used by flows that must
/// persist a fresh history record.
pub async fn get_detailed_asset_data(
    provider: &dyn QuoteProvider,
    ticker: &str,
    cached_name: Option<&str>,
) -> Result<DetailedMarketData, AppError> {
    let quote = provider.fetch_quote(ticker).await.map_err(|e| match e {
        QuoteProviderError::NoData(_) => {
            AppError::Validation(format!("No price data available for {ticker}"))
        }
        other => {
            error!("Failed to fetch detailed data for {}: {}", ticker, other);
            AppError::UpstreamUnavailable(format!(
                "Failed to fetch detailed data for {ticker}: {other}"
            ))
        }
    })?;

    let (name, currency) = match cached_name {
        Some(name) => (name.to_string(), DEFAULT_CURRENCY.to_string()),
        None => resolve_company_name(provider, ticker).await,
    };

    Ok(DetailedMarketData {
        ticker: ticker.to_string(),
        name,
        current_price: quote.current,
        open_price: quote.open,
        high_price: quote.high,
        low_price: quote.low,
        previous_close: quote.previous_close,
        percent_change: quote.percent_change,
        volume: quote.volume,
        timestamp: quote.timestamp,
        currency,
    })
}

/// A ticker already in the assets table counts as valid without any call.
pub async fn validate_ticker(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    ticker: &str,
) -> Result<bool, AppError> {
    if db::asset_queries::fetch_by_ticker(pool, ticker).await?.is_some() {
        return Ok(true);
    }
    Ok(validate_ticker_direct(provider, ticker).await)
}

pub async fn validate_ticker_direct(provider: &dyn QuoteProvider, ticker: &str) -> bool {
    match provider.fetch_quote(ticker).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Invalid ticker {}: {}", ticker, e);
            false
        }
    }
}

pub fn bar_from_detailed(data: &DetailedMarketData) -> HistoryBar {
    HistoryBar {
        open: data.open_price,
        high: data.high_price,
        low: data.low_price,
        close: data.current_price,
        volume: data.volume,
    }
}

/// Full refresh for one ticker: asset upsert plus history upsert in one
/// database transaction. Skipped entirely when the row is under an hour old.
pub async fn upsert_asset(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    ticker: &str,
) -> Result<UpsertAssetResult, AppError> {
    let cached = db::asset_queries::fetch_by_ticker(pool, ticker).await?;

    if let Some(asset) = &cached {
        if is_price_fresh(asset.last_updated, Utc::now()) {
            info!(
                "Asset {} was updated within 60 minutes, skipping update",
                ticker
            );
            return Ok(UpsertAssetResult {
                asset: asset.clone(),
                history_updated: false,
                history_created: false,
            });
        }
    }

    if cached.is_none() && !validate_ticker_direct(provider, ticker).await {
        return Err(AppError::Validation(format!("Invalid ticker: {ticker}")));
    }

    let detailed =
        get_detailed_asset_data(provider, ticker, cached.as_ref().map(|a| a.name.as_str()))
            .await?;
    let now = Utc::now();

    // Cached name wins over the freshly resolved one
    let name = cached
        .as_ref()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| detailed.name.clone());
    let asset_type = cached
        .as_ref()
        .map(|a| a.asset_type)
        .unwrap_or_else(|| AssetType::from_ticker(ticker));

    let mut tx = pool.begin().await?;
    let asset = db::asset_queries::upsert_market_data(
        &mut *tx,
        ticker,
        &name,
        asset_type,
        detailed.current_price,
        detailed.percent_change,
        &detailed.currency,
        now,
    )
    .await?;
    let (_, is_new) =
        asset_service::upsert_history(&mut tx, asset.id, &bar_from_detailed(&detailed), now)
            .await?;
    tx.commit().await?;

    info!(
        "Asset {} upserted with price: {}",
        ticker, detailed.current_price
    );

    Ok(UpsertAssetResult {
        asset,
        history_updated: true,
        history_created: is_new,
    })
}

/// Price-only refresh: updates the asset row without writing history.
/// Batch refreshes trade historical fidelity for fewer writes.
pub async fn update_price_only(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    ticker: &str,
) -> Result<Asset, AppError> {
    let cached = db::asset_queries::fetch_by_ticker(pool, ticker).await?;

    if let Some(asset) = &cached {
        if is_price_fresh(asset.last_updated, Utc::now()) {
            debug!(
                "Asset {} was updated within 60 minutes, skipping update",
                ticker
            );
            return Ok(asset.clone());
        }
    }

    if cached.is_none() && !validate_ticker_direct(provider, ticker).await {
        return Err(AppError::Validation(format!("Invalid ticker: {ticker}")));
    }

    let market_data = get_asset_data(pool, provider, ticker).await?;
    let now = Utc::now();

    let name = cached
        .as_ref()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| market_data.name.clone());
    let asset_type = cached
        .as_ref()
        .map(|a| a.asset_type)
        .unwrap_or_else(|| AssetType::from_ticker(ticker));

    let asset = db::asset_queries::upsert_market_data(
        pool,
        ticker,
        &name,
        asset_type,
        market_data.current_price,
        market_data.percent_change,
        &market_data.currency,
        now,
    )
    .await?;

    debug!(
        "Price-only update for {}: {}",
        ticker, market_data.current_price
    );
    Ok(asset)
}

/// Sequential batch refresh; one bad ticker never aborts the rest.
pub async fn update_asset_prices(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    tickers: &[String],
    update_history: bool,
) -> Vec<BatchUpdateOutcome> {
    info!(
        "Batch updating {} assets, update_history: {}",
        tickers.len(),
        update_history
    );

    let mut results = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let outcome = if update_history {
            upsert_asset(pool, provider, ticker).await.map(|_| ())
        } else {
            update_price_only(pool, provider, ticker).await.map(|_| ())
        };

        match outcome {
            Ok(()) => results.push(BatchUpdateOutcome {
                ticker: ticker.clone(),
                success: true,
                error: None,
            }),
            Err(e) => {
                error!("Failed to update {}: {}", ticker, e);
                results.push(BatchUpdateOutcome {
                    ticker: ticker.clone(),
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let successful = results.iter().filter(|r| r.success).count();
    info!(
        "Batch update completed: {}/{} successful",
        successful,
        tickers.len()
    );
    results
}

pub async fn get_batch_quotes(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    tickers: &[String],
) -> Vec<MarketData> {
    let mut results = Vec::new();
    for ticker in tickers {
        match get_asset_data(pool, provider, ticker).await {
            Ok(data) => results.push(data),
            Err(e) => {
                // Best effort: skip tickers that fail and keep going
                error!("Failed to fetch data for {}: {}", ticker, e);
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_quote_is_not_refetched() {
        let now = Utc::now();
        assert!(is_price_fresh(Some(now - Duration::minutes(59)), now));
        assert!(is_price_fresh(Some(now), now));
    }

    #[test]
    fn hour_old_quote_is_stale() {
        let now = Utc::now();
        assert!(!is_price_fresh(Some(now - Duration::hours(1)), now));
        assert!(!is_price_fresh(Some(now - Duration::days(3)), now));
    }

    #[test]
    fn never_updated_is_stale() {
        assert!(!is_price_fresh(None, Utc::now()));
    }
}
