use std::collections::HashMap;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    AssetType, AssetTypeCashflow, CashflowByAssetType, CashflowSummary, CreateTransaction,
    Transaction, TransactionBucket, TransactionStats, TransactionType,
};

pub async fn create_transaction(
    pool: &PgPool,
    input: CreateTransaction,
) -> Result<Transaction, AppError> {
    if input.total_amount < 0.0 {
        return Err(AppError::Validation(
            "Total amount cannot be negative".into(),
        ));
    }
    if let Some(q) = input.quantity {
        if q <= 0.0 {
            return Err(AppError::Validation("Quantity must be > 0".into()));
        }
    }
    if let Some(p) = input.price_per_unit {
        if p <= 0.0 {
            return Err(AppError::Validation("Price per unit must be > 0".into()));
        }
    }

    db::account_queries::fetch_one(pool, input.account_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Account with ID {} not found", input.account_id))
        })?;

    let tx = db::transaction_queries::insert(pool, &input).await?;
    info!(
        "Recorded {:?} transaction {} for account {}",
        tx.transaction_type, tx.id, tx.account_id
    );
    Ok(tx)
}

pub async fn list_transactions(pool: &PgPool) -> Result<Vec<Transaction>, AppError> {
    Ok(db::transaction_queries::fetch_all(pool).await?)
}

pub async fn get_transaction(pool: &PgPool, id: Uuid) -> Result<Transaction, AppError> {
    db::transaction_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction with ID {id} not found")))
}

pub async fn transactions_by_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<Transaction>, AppError> {
    Ok(db::transaction_queries::fetch_by_account(pool, account_id).await?)
}

pub async fn transactions_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Vec<Transaction>, AppError> {
    db::user_queries::fetch_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {username}")))?;
    Ok(db::transaction_queries::fetch_by_username(pool, username).await?)
}

pub async fn delete_transaction(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let deleted = db::transaction_queries::delete(pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!(
            "Transaction with ID {id} not found"
        )));
    }
    Ok(())
}

/// Split the last `days` of ledger activity into income and spending.
/// Deposits, dividends and interest count as income; buys, sells and
/// withdrawals count as spending.
pub async fn cashflow_analysis(
    pool: &PgPool,
    username: &str,
    days: i64,
) -> Result<CashflowSummary, AppError> {
    if days <= 0 {
        return Err(AppError::Validation("Days must be > 0".into()));
    }

    db::user_queries::fetch_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {username}")))?;

    let since = Utc::now() - Duration::days(days);
    let transactions =
        db::transaction_queries::fetch_by_username_since(pool, username, since).await?;

    Ok(summarize_cashflow(days, transactions))
}

/// Cashflow analysis grouped by the asset type behind each transaction.
/// Cash moves with no asset reference form their own "cash" group.
pub async fn cashflow_by_asset_type(
    pool: &PgPool,
    username: &str,
    days: i64,
) -> Result<CashflowByAssetType, AppError> {
    let summary = cashflow_analysis(pool, username, days).await?;

    let mut asset_types: HashMap<Uuid, AssetType> = HashMap::new();
    for tx in &summary.transactions {
        if let Some(asset_id) = tx.asset_id {
            if !asset_types.contains_key(&asset_id) {
                if let Some(asset) = db::asset_queries::fetch_one(pool, asset_id).await? {
                    asset_types.insert(asset_id, asset.asset_type);
                }
            }
        }
    }

    let by_asset_type = group_by_asset_type(&summary.transactions, &asset_types);
    Ok(CashflowByAssetType {
        period_days: days,
        summary,
        by_asset_type,
    })
}

/// Transaction counts and volumes for the last `days`, bucketed by
/// transaction type and by asset name.
pub async fn transaction_stats(
    pool: &PgPool,
    username: &str,
    days: i64,
) -> Result<TransactionStats, AppError> {
    if days <= 0 {
        return Err(AppError::Validation("Days must be > 0".into()));
    }

    db::user_queries::fetch_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {username}")))?;

    let since = Utc::now() - Duration::days(days);
    let transactions =
        db::transaction_queries::fetch_by_username_since(pool, username, since).await?;

    let mut asset_names: HashMap<Uuid, String> = HashMap::new();
    for tx in &transactions {
        if let Some(asset_id) = tx.asset_id {
            if !asset_names.contains_key(&asset_id) {
                if let Some(asset) = db::asset_queries::fetch_one(pool, asset_id).await? {
                    asset_names.insert(asset_id, asset.name);
                }
            }
        }
    }

    Ok(compute_stats(days, &transactions, &asset_names))
}

fn summarize_cashflow(days: i64, transactions: Vec<Transaction>) -> CashflowSummary {
    let mut income = 0.0;
    let mut spending = 0.0;
    for tx in &transactions {
        if tx.transaction_type.is_income() {
            income += tx.total_amount;
        } else {
            spending += tx.total_amount;
        }
    }
    CashflowSummary {
        period_days: days,
        income,
        spending,
        net_cashflow: income - spending,
        transactions,
    }
}

fn group_by_asset_type(
    transactions: &[Transaction],
    asset_types: &HashMap<Uuid, AssetType>,
) -> HashMap<String, AssetTypeCashflow> {
    let mut groups: HashMap<String, AssetTypeCashflow> = HashMap::new();

    for tx in transactions {
        let label = tx
            .asset_id
            .and_then(|id| asset_types.get(&id))
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "cash".to_string());

        let group = groups.entry(label).or_default();
        if tx.transaction_type.is_income() {
            group.income += tx.total_amount;
        } else {
            group.spending += tx.total_amount;
        }
        group.transactions.push(tx.clone());
    }

    for group in groups.values_mut() {
        group.net_cashflow = group.income - group.spending;
    }
    groups
}

fn compute_stats(
    days: i64,
    transactions: &[Transaction],
    asset_names: &HashMap<Uuid, String>,
) -> TransactionStats {
    let mut by_type: HashMap<String, TransactionBucket> = HashMap::new();
    let mut by_asset: HashMap<String, TransactionBucket> = HashMap::new();
    let mut total_volume = 0.0;

    for tx in transactions {
        total_volume += tx.total_amount;

        let type_bucket = by_type
            .entry(tx.transaction_type.as_str().to_string())
            .or_default();
        type_bucket.count += 1;
        type_bucket.volume += tx.total_amount;

        let asset_label = tx
            .asset_id
            .and_then(|id| asset_names.get(&id))
            .cloned()
            .unwrap_or_else(|| "Cash".to_string());
        let asset_bucket = by_asset.entry(asset_label).or_default();
        asset_bucket.count += 1;
        asset_bucket.volume += tx.total_amount;
    }

    TransactionStats {
        period_days: days,
        total_transactions: transactions.len(),
        total_volume,
        by_type,
        by_asset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tx_type: TransactionType, amount: f64) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            transaction_type: tx_type,
            transaction_date: Utc::now(),
            quantity: None,
            price_per_unit: None,
            total_amount: amount,
            description: None,
            asset_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cashflow_splits_income_and_spending() {
        let summary = summarize_cashflow(
            30,
            vec![
                entry(TransactionType::Deposit, 1000.0),
                entry(TransactionType::Dividend, 25.5),
                entry(TransactionType::Buy, 600.0),
                entry(TransactionType::Withdrawal, 200.0),
            ],
        );
        assert_eq!(summary.period_days, 30);
        assert_eq!(summary.income, 1025.5);
        assert_eq!(summary.spending, 800.0);
        assert!((summary.net_cashflow - 225.5).abs() < 1e-9);
        assert_eq!(summary.transactions.len(), 4);
    }

    #[test]
    fn empty_period_nets_to_zero() {
        let summary = summarize_cashflow(7, vec![]);
        assert_eq!(summary.income, 0.0);
        assert_eq!(summary.spending, 0.0);
        assert_eq!(summary.net_cashflow, 0.0);
    }

    fn asset_entry(tx_type: TransactionType, amount: f64, asset_id: Uuid) -> Transaction {
        Transaction {
            asset_id: Some(asset_id),
            ..entry(tx_type, amount)
        }
    }

    #[test]
    fn cashflow_groups_by_asset_type_with_cash_fallback() {
        let stock_id = Uuid::new_v4();
        let crypto_id = Uuid::new_v4();
        let asset_types = HashMap::from([
            (stock_id, AssetType::Stock),
            (crypto_id, AssetType::Crypto),
        ]);

        let groups = group_by_asset_type(
            &[
                asset_entry(TransactionType::Buy, 600.0, stock_id),
                asset_entry(TransactionType::Dividend, 25.0, stock_id),
                asset_entry(TransactionType::Buy, 300.0, crypto_id),
                entry(TransactionType::Deposit, 1000.0),
            ],
            &asset_types,
        );

        let stock = &groups["stock"];
        assert_eq!(stock.income, 25.0);
        assert_eq!(stock.spending, 600.0);
        assert_eq!(stock.net_cashflow, -575.0);
        assert_eq!(stock.transactions.len(), 2);

        assert_eq!(groups["crypto"].spending, 300.0);

        // No asset reference -> cash group
        let cash = &groups["cash"];
        assert_eq!(cash.income, 1000.0);
        assert_eq!(cash.net_cashflow, 1000.0);
    }

    #[test]
    fn unknown_asset_id_falls_back_to_cash_group() {
        let groups = group_by_asset_type(
            &[asset_entry(TransactionType::Buy, 50.0, Uuid::new_v4())],
            &HashMap::new(),
        );
        assert_eq!(groups["cash"].spending, 50.0);
    }

    #[test]
    fn stats_bucket_by_type_and_asset() {
        let apple_id = Uuid::new_v4();
        let asset_names = HashMap::from([(apple_id, "Apple Inc".to_string())]);

        let stats = compute_stats(
            30,
            &[
                asset_entry(TransactionType::Buy, 600.0, apple_id),
                asset_entry(TransactionType::Buy, 400.0, apple_id),
                asset_entry(TransactionType::Sell, 200.0, apple_id),
                entry(TransactionType::Deposit, 1000.0),
            ],
            &asset_names,
        );

        assert_eq!(stats.period_days, 30);
        assert_eq!(stats.total_transactions, 4);
        assert_eq!(stats.total_volume, 2200.0);

        assert_eq!(stats.by_type["buy"].count, 2);
        assert_eq!(stats.by_type["buy"].volume, 1000.0);
        assert_eq!(stats.by_type["sell"].count, 1);
        assert_eq!(stats.by_type["deposit"].volume, 1000.0);

        assert_eq!(stats.by_asset["Apple Inc"].count, 3);
        assert_eq!(stats.by_asset["Apple Inc"].volume, 1200.0);
        assert_eq!(stats.by_asset["Cash"].count, 1);
    }

    #[test]
    fn stats_over_no_transactions_are_empty() {
        let stats = compute_stats(7, &[], &HashMap::new());
        assert_eq!(stats.total_transactions, 0);
        assert_eq!(stats.total_volume, 0.0);
        assert!(stats.by_type.is_empty());
        assert!(stats.by_asset.is_empty());
    }
}
