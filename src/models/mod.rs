mod account;
mod asset;
mod asset_history;
mod holding;
mod portfolio;
mod transaction;

pub use account::Account;
pub use asset::{Asset, AssetType, CreateAsset, UpdateAsset};
pub use asset_history::{AssetHistory, HistoryBar, HistoryPage, HistoryStats};
pub use holding::{
    BuyRequest, BuyResult, CreateHolding, Holding, SellRequest, SellResult, UpdateHolding,
};
pub use portfolio::{
    AccountSummary, HoldingSummary, Portfolio, PortfolioSnapshot, PortfolioSummary, TopPerformers,
    User,
};
pub use transaction::{
    AssetTypeCashflow, CashflowByAssetType, CashflowSummary, CreateTransaction, Transaction,
    TransactionBucket, TransactionStats, TransactionType,
};
