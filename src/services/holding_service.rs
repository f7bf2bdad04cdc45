use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::external::quote_provider::QuoteProvider;
use crate::models::{
    Account, Asset, AssetType, BuyRequest, BuyResult, CreateHolding, CreateTransaction, Holding,
    SellRequest, SellResult, TransactionType, UpdateHolding,
};
use crate::services::market_data_service;

/// Quantity-weighted mean of every buy so far.
pub fn weighted_average_cost(old_qty: f64, old_avg: f64, qty: f64, price: f64) -> f64 {
    (old_qty * old_avg + qty * price) / (old_qty + qty)
}

#[derive(Debug, PartialEq)]
pub struct SellPlan {
    pub sell_quantity: f64,
    pub remaining: f64,
    pub is_full_sell: bool,
}

/// Single code path for full and partial sells: omitted quantity means the
/// whole position, and a partial sell that reaches zero behaves exactly like
/// a full sell.
pub fn plan_sell(held: f64, requested: Option<f64>) -> Result<SellPlan, AppError> {
    if held <= 0.0 {
        return Err(AppError::Validation("No shares to sell".into()));
    }

    let sell_quantity = match requested {
        None => held,
        Some(q) if q <= 0.0 => {
            return Err(AppError::Validation(
                "Sell quantity must be greater than 0".into(),
            ))
        }
        Some(q) if q > held => {
            return Err(AppError::InsufficientQuantity {
                available: held,
                requested: q,
            })
        }
        Some(q) => q,
    };

    let remaining = held - sell_quantity;
    Ok(SellPlan {
        sell_quantity,
        remaining,
        is_full_sell: remaining == 0.0,
    })
}

/// Sell price resolution order: explicit argument, then a (possibly cached,
/// if fresh) quote, then the asset's last known price as a logged fallback.
async fn resolve_sell_price(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    asset: &Asset,
    explicit: Option<f64>,
) -> Result<f64, AppError> {
    if let Some(price) = explicit {
        if price <= 0.0 {
            return Err(AppError::Validation("Sell price must be > 0".into()));
        }
        return Ok(price);
    }

    match market_data_service::get_asset_data(pool, provider, &asset.ticker).await {
        Ok(data) => Ok(data.current_price),
        Err(_) => match asset.current_price {
            Some(price) => {
                warn!("Using cached price for {}: {}", asset.ticker, price);
                Ok(price)
            }
            None => Err(AppError::PriceUnavailable(format!(
                "Unable to determine sell price for {}",
                asset.ticker
            ))),
        },
    }
}

async fn resolve_account(
    pool: &PgPool,
    username: &str,
    account_id: Option<Uuid>,
) -> Result<Account, AppError> {
    let portfolio = db::portfolio_queries::fetch_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio not found for user: {username}")))?;

    let account = match account_id {
        Some(id) => db::account_queries::fetch_one(pool, id)
            .await?
            .filter(|a| a.portfolio_id == portfolio.id)
            .ok_or_else(|| AppError::NotFound(format!("Account with ID {id} not found")))?,
        None => db::account_queries::fetch_default(pool, portfolio.id)
            .await?
            .ok_or_else(|| AppError::Validation("No account found for user".into()))?,
    };

    Ok(account)
}

/// Buy into a position. Creates the holding on first buy, otherwise folds
/// the purchase into the weighted average cost basis. Holding mutation and
/// the `buy` ledger entry commit atomically.
pub async fn buy(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    req: BuyRequest,
) -> Result<BuyResult, AppError> {
    if req.quantity <= 0.0 {
        return Err(AppError::Validation("Quantity must be > 0".into()));
    }

    let account = resolve_account(pool, &req.username, Some(req.account_id)).await?;
    let trade_date = req.transaction_date.unwrap_or_else(Utc::now);

    if !market_data_service::validate_ticker(pool, provider, &req.ticker).await? {
        return Err(AppError::Validation(format!(
            "Invalid ticker: {}",
            req.ticker
        )));
    }

    let (asset, purchase_price) = if req.update_market_price {
        let upserted = market_data_service::upsert_asset(pool, provider, &req.ticker).await?;
        let price = req.price.or(upserted.asset.current_price);
        (upserted.asset, price)
    } else {
        let asset = match db::asset_queries::fetch_by_ticker(pool, &req.ticker).await? {
            Some(asset) => asset,
            None => {
                // First sighting of this ticker: create the asset without
                // forcing a market refresh, stamped with the trade date.
                let data =
                    market_data_service::get_asset_data(pool, provider, &req.ticker).await?;
                db::asset_queries::insert(
                    pool,
                    &req.ticker,
                    &data.name,
                    AssetType::from_ticker(&req.ticker),
                    Some(data.current_price),
                    Some(data.percent_change),
                    Some(trade_date),
                    &data.currency,
                )
                .await?
            }
        };
        let price = match req.price.or(asset.current_price) {
            Some(p) => Some(p),
            None => market_data_service::get_asset_data(pool, provider, &req.ticker)
                .await
                .ok()
                .map(|d| d.current_price),
        };
        (asset, price)
    };

    let purchase_price = purchase_price.ok_or_else(|| {
        AppError::PriceUnavailable(format!(
            "Unable to determine purchase price for {}",
            req.ticker
        ))
    })?;
    if purchase_price <= 0.0 {
        return Err(AppError::Validation("Purchase price must be > 0".into()));
    }

    let mut tx = pool.begin().await?;

    let existing =
        db::holding_queries::fetch_pair_for_update(&mut *tx, account.id, asset.id).await?;
    let holding = match existing {
        Some(h) => {
            let new_qty = h.quantity + req.quantity;
            let new_avg =
                weighted_average_cost(h.quantity, h.average_cost_basis, req.quantity, purchase_price);
            db::holding_queries::update_position(&mut *tx, h.id, new_qty, new_avg).await?
        }
        None => {
            db::holding_queries::insert(&mut *tx, account.id, asset.id, req.quantity, purchase_price)
                .await?
        }
    };

    let transaction = db::transaction_queries::insert(
        &mut *tx,
        &CreateTransaction {
            account_id: account.id,
            transaction_type: TransactionType::Buy,
            transaction_date: trade_date,
            quantity: Some(req.quantity),
            price_per_unit: Some(purchase_price),
            total_amount: req.quantity * purchase_price,
            description: Some(req.description.unwrap_or_else(|| {
                format!("Bought {} shares of {}", req.quantity, req.ticker)
            })),
            asset_id: Some(asset.id),
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        "User {} bought {} shares of {} at {}",
        req.username, req.quantity, req.ticker, purchase_price
    );

    Ok(BuyResult {
        holding,
        transaction,
        price_used: purchase_price,
    })
}

/// Sell out of a position. The holding is re-read with a row lock inside the
/// transaction, so the quantity check, the holding mutation (or deletion on
/// full sell) and the `sell` ledger entry are one atomic unit.
pub async fn sell(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    req: SellRequest,
) -> Result<SellResult, AppError> {
    let account = resolve_account(pool, &req.username, req.account_id).await?;

    let asset = db::asset_queries::fetch_by_ticker(pool, &req.ticker)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No holding found for ticker: {}", req.ticker)))?;

    // Early existence check; the authoritative read happens under the lock.
    db::holding_queries::fetch_pair(pool, account.id, asset.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No holding found for ticker: {}", req.ticker)))?;

    let sell_price = resolve_sell_price(pool, provider, &asset, req.price).await?;

    let mut tx = pool.begin().await?;

    let holding = db::holding_queries::fetch_pair_for_update(&mut *tx, account.id, asset.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No holding found for ticker: {}", req.ticker)))?;

    let plan = plan_sell(holding.quantity, req.quantity)?;
    let total_amount = plan.sell_quantity * sell_price;

    let remaining_holding = if plan.is_full_sell {
        db::holding_queries::delete(&mut *tx, holding.id).await?;
        None
    } else {
        Some(
            db::holding_queries::update_position(
                &mut *tx,
                holding.id,
                plan.remaining,
                holding.average_cost_basis,
            )
            .await?,
        )
    };

    let transaction = db::transaction_queries::insert(
        &mut *tx,
        &CreateTransaction {
            account_id: account.id,
            transaction_type: TransactionType::Sell,
            transaction_date: Utc::now(),
            quantity: Some(plan.sell_quantity),
            price_per_unit: Some(sell_price),
            total_amount,
            description: Some(if plan.is_full_sell {
                format!("Sold all {} shares of {}", plan.sell_quantity, req.ticker)
            } else {
                format!("Sold {} shares of {}", plan.sell_quantity, req.ticker)
            }),
            asset_id: Some(asset.id),
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        "User {} sold {} shares of {} at {} ({})",
        req.username,
        plan.sell_quantity,
        req.ticker,
        sell_price,
        if plan.is_full_sell {
            "full sell"
        } else {
            "partial sell"
        }
    );

    Ok(SellResult {
        ticker: req.ticker,
        quantity: plan.sell_quantity,
        sell_price,
        total_amount,
        is_full_sell: plan.is_full_sell,
        remaining_holding,
        transaction,
    })
}

/// Sell addressed by holding id rather than (user, ticker).
pub async fn sell_position(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    holding_id: Uuid,
    quantity: Option<f64>,
    price: Option<f64>,
) -> Result<SellResult, AppError> {
    let holding = get_holding(pool, holding_id).await?;
    let asset = db::asset_queries::fetch_one(pool, holding.asset_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Asset with ID {} not found", holding.asset_id))
        })?;

    let sell_price = resolve_sell_price(pool, provider, &asset, price).await?;

    let mut tx = pool.begin().await?;

    let holding = db::holding_queries::fetch_one_for_update(&mut *tx, holding_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Holding with ID {holding_id} not found")))?;

    let plan = plan_sell(holding.quantity, quantity)?;
    let total_amount = plan.sell_quantity * sell_price;

    let remaining_holding = if plan.is_full_sell {
        db::holding_queries::delete(&mut *tx, holding.id).await?;
        None
    } else {
        Some(
            db::holding_queries::update_position(
                &mut *tx,
                holding.id,
                plan.remaining,
                holding.average_cost_basis,
            )
            .await?,
        )
    };

    let transaction = db::transaction_queries::insert(
        &mut *tx,
        &CreateTransaction {
            account_id: holding.account_id,
            transaction_type: TransactionType::Sell,
            transaction_date: Utc::now(),
            quantity: Some(plan.sell_quantity),
            price_per_unit: Some(sell_price),
            total_amount,
            description: Some(format!(
                "Sold {} shares of {}",
                plan.sell_quantity, asset.ticker
            )),
            asset_id: Some(asset.id),
        },
    )
    .await?;

    tx.commit().await?;

    Ok(SellResult {
        ticker: asset.ticker,
        quantity: plan.sell_quantity,
        sell_price,
        total_amount,
        is_full_sell: plan.is_full_sell,
        remaining_holding,
        transaction,
    })
}

pub async fn create_holding(pool: &PgPool, input: CreateHolding) -> Result<Holding, AppError> {
    if input.quantity <= 0.0 {
        return Err(AppError::Validation("Quantity must be > 0".into()));
    }
    if input.average_cost_basis < 0.0 {
        return Err(AppError::Validation(
            "Average cost basis cannot be negative".into(),
        ));
    }

    db::holding_queries::insert(
        pool,
        input.account_id,
        input.asset_id,
        input.quantity,
        input.average_cost_basis,
    )
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => AppError::Validation(
            "Holding already exists for this account and asset combination".into(),
        ),
        Some(db_err) if db_err.is_foreign_key_violation() => {
            AppError::NotFound("Account or asset does not exist".into())
        }
        _ => AppError::Db(e),
    })
}

pub async fn list_holdings(pool: &PgPool) -> Result<Vec<Holding>, AppError> {
    Ok(db::holding_queries::fetch_all(pool).await?)
}

pub async fn get_holding(pool: &PgPool, id: Uuid) -> Result<Holding, AppError> {
    db::holding_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Holding with ID {id} not found")))
}

pub async fn holdings_by_account(pool: &PgPool, account_id: Uuid) -> Result<Vec<Holding>, AppError> {
    Ok(db::holding_queries::fetch_by_account(pool, account_id).await?)
}

pub async fn holdings_by_username(pool: &PgPool, username: &str) -> Result<Vec<Holding>, AppError> {
    db::portfolio_queries::fetch_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio not found for user: {username}")))?;
    Ok(db::holding_queries::fetch_by_username(pool, username).await?)
}

pub async fn update_holding(
    pool: &PgPool,
    id: Uuid,
    input: UpdateHolding,
) -> Result<Holding, AppError> {
    if let Some(q) = input.quantity {
        if q < 0.0 {
            return Err(AppError::Validation("Quantity cannot be negative".into()));
        }
    }
    if let Some(c) = input.average_cost_basis {
        if c < 0.0 {
            return Err(AppError::Validation(
                "Average cost basis cannot be negative".into(),
            ));
        }
    }

    db::holding_queries::update(pool, id, input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Holding with ID {id} not found")))
}

pub async fn delete_holding(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let deleted = db::holding_queries::delete(pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Holding with ID {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_buy_cost_basis_is_the_price() {
        // New holdings take the purchase price directly; the formula agrees.
        assert_eq!(weighted_average_cost(0.0, 0.0, 100.0, 150.0), 150.0);
    }

    #[test]
    fn weighted_average_over_two_buys() {
        // 100 @ 150 then 50 @ 160 -> (100*150 + 50*160) / 150
        let avg = weighted_average_cost(100.0, 150.0, 50.0, 160.0);
        assert!((avg - 153.33333333333334).abs() < 1e-9);
    }

    #[test]
    fn equal_prices_leave_average_unchanged() {
        let avg = weighted_average_cost(30.0, 42.0, 70.0, 42.0);
        assert_eq!(avg, 42.0);
    }

    #[test]
    fn omitted_quantity_sells_everything() {
        let plan = plan_sell(150.0, None).unwrap();
        assert_eq!(plan.sell_quantity, 150.0);
        assert_eq!(plan.remaining, 0.0);
        assert!(plan.is_full_sell);
    }

    #[test]
    fn partial_sell_leaves_remainder() {
        let plan = plan_sell(150.0, Some(50.0)).unwrap();
        assert_eq!(plan.sell_quantity, 50.0);
        assert_eq!(plan.remaining, 100.0);
        assert!(!plan.is_full_sell);
    }

    #[test]
    fn partial_sell_reaching_zero_is_a_full_sell() {
        let plan = plan_sell(150.0, Some(150.0)).unwrap();
        assert!(plan.is_full_sell);
        assert_eq!(plan.remaining, 0.0);
    }

    #[test]
    fn overselling_is_rejected() {
        let err = plan_sell(150.0, Some(151.0)).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientQuantity {
                available,
                requested
            } if available == 150.0 && requested == 151.0
        ));
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert!(matches!(
            plan_sell(150.0, Some(0.0)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            plan_sell(150.0, Some(-5.0)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn empty_position_cannot_sell() {
        assert!(matches!(plan_sell(0.0, None), Err(AppError::Validation(_))));
    }
}
