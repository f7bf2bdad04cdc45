use async_trait::async_trait;
use thiserror::Error;

/// A live quote as reported by the market-data provider.
#[derive(Debug, Clone)]
pub struct Quote {
    pub current: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    pub percent_change: f64,
    /// Not every provider endpoint reports volume; absent stays absent.
    pub volume: Option<i64>,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct CompanyProfile {
    pub name: String,
    pub currency: Option<String>,
}

#[derive(Debug, Error)]
pub enum QuoteProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no data for ticker {0}")]
    NoData(String),

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Current price plus day OHLC and previous close for a ticker.
    /// A zero or missing price is reported as `NoData`.
    async fn fetch_quote(&self, ticker: &str) -> Result<Quote, QuoteProviderError>;

    /// Company profile lookup, used to resolve display names.
    async fn fetch_company_profile(
        &self,
        ticker: &str,
    ) -> Result<CompanyProfile, QuoteProviderError>;
}
