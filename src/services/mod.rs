pub mod asset_service;
pub mod holding_service;
pub mod market_data_service;
pub mod portfolio_service;
pub mod transaction_service;
