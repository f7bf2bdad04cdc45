use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::external::quote_provider::QuoteProvider;
use crate::models::{
    AccountSummary, Asset, Holding, HoldingSummary, Portfolio, PortfolioSnapshot,
    PortfolioSummary, TopPerformers,
};
use crate::services::market_data_service::{self, BatchUpdateOutcome};

fn is_cash_account(account_type: &str) -> bool {
    account_type.eq_ignore_ascii_case("depository")
}

/// Valuation of a single position. A holding whose asset has no quoted price
/// yet is valued at cost, which keeps its unrealized gain at zero instead of
/// pretending the position is worthless.
fn summarize_holding(holding: &Holding, asset: &Asset) -> HoldingSummary {
    let price = asset.current_price.unwrap_or(holding.average_cost_basis);
    let market_value = holding.quantity * price;
    let cost = holding.quantity * holding.average_cost_basis;
    let unrealized_gain_loss = market_value - cost;
    let percent_change = if cost > 0.0 {
        unrealized_gain_loss / cost * 100.0
    } else {
        0.0
    };

    HoldingSummary {
        id: holding.id,
        ticker: asset.ticker.clone(),
        name: asset.name.clone(),
        asset_type: asset.asset_type,
        quantity: holding.quantity,
        average_cost_basis: holding.average_cost_basis,
        current_price: asset.current_price,
        market_value,
        unrealized_gain_loss,
        percent_change,
    }
}

async fn load_assets_for(
    pool: &PgPool,
    holdings: &[Holding],
) -> Result<HashMap<Uuid, Asset>, AppError> {
    let mut assets = HashMap::new();
    for holding in holdings {
        if assets.contains_key(&holding.asset_id) {
            continue;
        }
        if let Some(asset) = db::asset_queries::fetch_one(pool, holding.asset_id).await? {
            assets.insert(asset.id, asset);
        }
    }
    Ok(assets)
}

async fn require_portfolio(pool: &PgPool, username: &str) -> Result<Portfolio, AppError> {
    db::portfolio_queries::fetch_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio not found for user: {username}")))
}

/// Refresh any stale prices among the user's holdings before valuation. A
/// failed refresh is logged and absorbed: the summary falls back to whatever
/// price is cached.
async fn refresh_stale_prices(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    assets: &HashMap<Uuid, Asset>,
) -> Vec<BatchUpdateOutcome> {
    let now = Utc::now();
    let stale: Vec<String> = assets
        .values()
        .filter(|a| !market_data_service::is_price_fresh(a.price_updated_at, now))
        .map(|a| a.ticker.clone())
        .collect();

    if stale.is_empty() {
        return Vec::new();
    }

    info!("Refreshing {} stale prices", stale.len());
    let outcomes = market_data_service::update_asset_prices(pool, provider, &stale, false).await;
    for outcome in outcomes.iter().filter(|o| !o.success) {
        warn!(
            "Price refresh failed for {}: {:?}",
            outcome.ticker, outcome.error
        );
    }
    outcomes
}

/// Full portfolio valuation: every account with its holdings marked to the
/// latest price, split into cash and investment value.
pub async fn get_portfolio(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    username: &str,
) -> Result<PortfolioSummary, AppError> {
    let portfolio = require_portfolio(pool, username).await?;
    let accounts = db::account_queries::fetch_by_portfolio(pool, portfolio.id).await?;

    let all_holdings = db::holding_queries::fetch_by_username(pool, username).await?;
    let assets = load_assets_for(pool, &all_holdings).await?;
    refresh_stale_prices(pool, provider, &assets).await;
    // Re-read so refreshed prices show up in the summary
    let assets = load_assets_for(pool, &all_holdings).await?;

    let mut cash_value = 0.0;
    let mut investment_value = 0.0;
    let mut account_summaries = Vec::with_capacity(accounts.len());

    for account in accounts {
        let holdings: Vec<HoldingSummary> = all_holdings
            .iter()
            .filter(|h| h.account_id == account.id)
            .filter_map(|h| assets.get(&h.asset_id).map(|a| summarize_holding(h, a)))
            .collect();

        let holdings_value: f64 = holdings.iter().map(|h| h.market_value).sum();
        if is_cash_account(&account.account_type) {
            cash_value += account.balance_current;
        } else {
            investment_value += holdings_value;
        }

        account_summaries.push(AccountSummary {
            id: account.id,
            institution_name: account.institution_name,
            account_name: account.account_name,
            account_type: account.account_type,
            balance_current: account.balance_current,
            holdings,
        });
    }

    Ok(PortfolioSummary {
        id: portfolio.id,
        name: portfolio.name,
        currency: portfolio.currency,
        total_value: cash_value + investment_value,
        cash_value,
        investment_value,
        accounts: account_summaries,
    })
}

/// Best and worst positions by unrealized percent change.
pub async fn top_performers(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    username: &str,
    limit: usize,
) -> Result<TopPerformers, AppError> {
    require_portfolio(pool, username).await?;

    let holdings = db::holding_queries::fetch_by_username(pool, username).await?;
    let assets = load_assets_for(pool, &holdings).await?;
    refresh_stale_prices(pool, provider, &assets).await;
    let assets = load_assets_for(pool, &holdings).await?;

    let summaries: Vec<HoldingSummary> = holdings
        .iter()
        .filter_map(|h| assets.get(&h.asset_id).map(|a| summarize_holding(h, a)))
        .collect();

    Ok(rank_performers(summaries, limit))
}

// Gainers must actually be up and losers actually down; a position at or
// below zero never pads the gainer list no matter how short it is.
fn rank_performers(mut summaries: Vec<HoldingSummary>, limit: usize) -> TopPerformers {
    summaries.sort_by(|a, b| {
        b.percent_change
            .partial_cmp(&a.percent_change)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let top_gainers: Vec<HoldingSummary> = summaries
        .iter()
        .filter(|h| h.percent_change > 0.0)
        .take(limit)
        .cloned()
        .collect();
    let top_losers: Vec<HoldingSummary> = summaries
        .iter()
        .rev()
        .filter(|h| h.percent_change < 0.0)
        .take(limit)
        .cloned()
        .collect();

    TopPerformers {
        top_gainers,
        top_losers,
    }
}

/// Refresh every ticker the user holds through the price-only path.
pub async fn refresh_prices(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    username: &str,
) -> Result<Vec<BatchUpdateOutcome>, AppError> {
    require_portfolio(pool, username).await?;

    let holdings = db::holding_queries::fetch_by_username(pool, username).await?;
    let assets = load_assets_for(pool, &holdings).await?;
    let mut tickers: Vec<String> = assets.values().map(|a| a.ticker.clone()).collect();
    tickers.sort();

    // Bulk refresh stays on the price-only path; daily history fidelity
    // comes from the per-asset refresh and market upsert endpoints.
    Ok(market_data_service::update_asset_prices(pool, provider, &tickers, false).await)
}

pub async fn portfolio_history(
    pool: &PgPool,
    username: &str,
    days: i64,
) -> Result<Vec<PortfolioSnapshot>, AppError> {
    if days <= 0 {
        return Err(AppError::Validation("Days must be > 0".into()));
    }
    let portfolio = require_portfolio(pool, username).await?;
    Ok(db::portfolio_queries::fetch_snapshots(pool, portfolio.id, days).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetType;
    use chrono::Utc;

    fn asset(ticker: &str, price: Option<f64>) -> Asset {
        Asset {
            id: Uuid::new_v4(),
            ticker: ticker.to_string(),
            name: ticker.to_string(),
            asset_type: AssetType::Stock,
            current_price: price,
            percent_change_today: None,
            price_updated_at: None,
            last_updated: None,
            currency: "USD".to_string(),
            created_at: Utc::now(),
        }
    }

    fn holding(asset_id: Uuid, quantity: f64, avg: f64) -> Holding {
        Holding {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            asset_id,
            quantity,
            average_cost_basis: avg,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn holding_is_marked_to_current_price() {
        let a = asset("AAPL", Some(200.0));
        let s = summarize_holding(&holding(a.id, 10.0, 150.0), &a);
        assert_eq!(s.market_value, 2000.0);
        assert_eq!(s.unrealized_gain_loss, 500.0);
        assert!((s.percent_change - 33.333333333333336).abs() < 1e-9);
    }

    #[test]
    fn unpriced_asset_is_valued_at_cost() {
        let a = asset("NEWCO", None);
        let s = summarize_holding(&holding(a.id, 10.0, 50.0), &a);
        assert_eq!(s.market_value, 500.0);
        assert_eq!(s.unrealized_gain_loss, 0.0);
        assert_eq!(s.percent_change, 0.0);
    }

    #[test]
    fn performers_are_ranked_by_percent_change() {
        let winners = asset("UP", Some(120.0));
        let losers = asset("DOWN", Some(80.0));
        let flat = asset("FLAT", Some(100.0));
        let summaries = vec![
            summarize_holding(&holding(flat.id, 1.0, 100.0), &flat),
            summarize_holding(&holding(winners.id, 1.0, 100.0), &winners),
            summarize_holding(&holding(losers.id, 1.0, 100.0), &losers),
        ];

        let ranked = rank_performers(summaries, 1);
        assert_eq!(ranked.top_gainers[0].ticker, "UP");
        assert_eq!(ranked.top_losers[0].ticker, "DOWN");
    }

    #[test]
    fn all_losing_portfolio_has_no_gainers() {
        let down1 = asset("DOWN1", Some(80.0));
        let down2 = asset("DOWN2", Some(60.0));
        let summaries = vec![
            summarize_holding(&holding(down1.id, 1.0, 100.0), &down1),
            summarize_holding(&holding(down2.id, 1.0, 100.0), &down2),
        ];

        let ranked = rank_performers(summaries, 5);
        assert!(ranked.top_gainers.is_empty());
        assert_eq!(ranked.top_losers.len(), 2);
        assert!(ranked.top_losers.iter().all(|h| h.percent_change < 0.0));
        // Worst position ranks first among losers
        assert_eq!(ranked.top_losers[0].ticker, "DOWN2");
    }

    #[test]
    fn flat_positions_are_neither_gainers_nor_losers() {
        let flat = asset("FLAT", Some(100.0));
        let up = asset("UP", Some(110.0));
        let summaries = vec![
            summarize_holding(&holding(flat.id, 1.0, 100.0), &flat),
            summarize_holding(&holding(up.id, 1.0, 100.0), &up),
        ];

        let ranked = rank_performers(summaries, 5);
        assert_eq!(ranked.top_gainers.len(), 1);
        assert_eq!(ranked.top_gainers[0].ticker, "UP");
        assert!(ranked.top_losers.is_empty());
    }

    #[test]
    fn depository_accounts_count_as_cash() {
        assert!(is_cash_account("depository"));
        assert!(is_cash_account("Depository"));
        assert!(!is_cash_account("investment"));
    }
}
