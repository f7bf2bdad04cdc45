pub mod account_queries;
pub mod asset_history_queries;
pub mod asset_queries;
pub mod holding_queries;
pub mod portfolio_queries;
pub mod transaction_queries;
pub mod user_queries;
