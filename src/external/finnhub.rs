use async_trait::async_trait;
use serde::Deserialize;

use crate::external::quote_provider::{CompanyProfile, Quote, QuoteProvider, QuoteProviderError};

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

pub struct FinnhubProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FinnhubProvider {
    pub fn from_env() -> Result<Self, QuoteProviderError> {
        let api_key = std::env::var("FINNHUB_API_KEY")
            .map_err(|_| QuoteProviderError::BadResponse("FINNHUB_API_KEY not set".into()))?;

        let base_url =
            std::env::var("FINNHUB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(api_key, base_url))
    }

    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

// Finnhub /quote response:
// c = current, d = change, dp = percent change, h = high, l = low,
// o = open, pc = previous close, t = unix timestamp.
// Unknown tickers come back as all zeros rather than an HTTP error.
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: Option<f64>,
    #[serde(default)]
    dp: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    l: Option<f64>,
    #[serde(default)]
    o: Option<f64>,
    #[serde(default)]
    pc: Option<f64>,
    #[serde(default)]
    t: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FinnhubProfile {
    name: Option<String>,
    currency: Option<String>,
}

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    async fn fetch_quote(&self, ticker: &str) -> Result<Quote, QuoteProviderError> {
        let url = format!("{}/quote", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| QuoteProviderError::Network(e.to_string()))?;

        if resp.status().as_u16() == 429 {
            return Err(QuoteProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(QuoteProviderError::BadResponse(format!(
                "quote request failed with status {}",
                resp.status()
            )));
        }

        let body = resp
            .json::<FinnhubQuote>()
            .await
            .map_err(|e| QuoteProviderError::Parse(e.to_string()))?;

        let current = body.c.unwrap_or(0.0);
        if current <= 0.0 {
            return Err(QuoteProviderError::NoData(ticker.to_string()));
        }

        Ok(Quote {
            current,
            open: body.o.unwrap_or(current),
            high: body.h.unwrap_or(current),
            low: body.l.unwrap_or(current),
            previous_close: body.pc.unwrap_or(current),
            percent_change: body.dp.unwrap_or(0.0),
            // The quote endpoint doesn't report volume
            volume: None,
            timestamp: body.t.unwrap_or(0),
        })
    }

    async fn fetch_company_profile(
        &self,
        ticker: &str,
    ) -> Result<CompanyProfile, QuoteProviderError> {
        let url = format!("{}/stock/profile2", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| QuoteProviderError::Network(e.to_string()))?;

        if resp.status().as_u16() == 429 {
            return Err(QuoteProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(QuoteProviderError::BadResponse(format!(
                "profile request failed with status {}",
                resp.status()
            )));
        }

        let body = resp
            .json::<FinnhubProfile>()
            .await
            .map_err(|e| QuoteProviderError::Parse(e.to_string()))?;

        let name = body
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| QuoteProviderError::NoData(ticker.to_string()))?;

        Ok(CompanyProfile {
            name,
            currency: body.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> FinnhubProvider {
        FinnhubProvider::new("test-key".into(), server.uri())
    }

    #[tokio::test]
    async fn quote_parses_full_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "c": 150.25, "d": 1.5, "dp": 1.01, "h": 151.0,
                "l": 148.5, "o": 149.0, "pc": 148.75, "t": 1700000000
            })))
            .mount(&server)
            .await;

        let quote = provider(&server).fetch_quote("AAPL").await.unwrap();
        assert_eq!(quote.current, 150.25);
        assert_eq!(quote.open, 149.0);
        assert_eq!(quote.previous_close, 148.75);
        assert_eq!(quote.percent_change, 1.01);
        assert_eq!(quote.volume, None);
    }

    #[tokio::test]
    async fn zero_price_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0
            })))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_quote("NOPE").await.unwrap_err();
        assert!(matches!(err, QuoteProviderError::NoData(_)));
    }

    #[tokio::test]
    async fn http_429_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuoteProviderError::RateLimited));
    }

    #[tokio::test]
    async fn profile_returns_name_and_currency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/profile2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Apple Inc", "currency": "USD", "exchange": "NASDAQ"
            })))
            .mount(&server)
            .await;

        let profile = provider(&server).fetch_company_profile("AAPL").await.unwrap();
        assert_eq!(profile.name, "Apple Inc");
        assert_eq!(profile.currency.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn empty_profile_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/profile2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch_company_profile("NOPE")
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteProviderError::NoData(_)));
    }
}
