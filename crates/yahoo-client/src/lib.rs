//! Yahoo Finance market-data collaborator.
//!
//! Fetches the `quoteSummary` modules that carry the fundamentals the
//! valuation calculator reads and flattens them into one field map.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use valuation_core::{MarketDataProvider, ValuationError};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Modules requested from `quoteSummary`, in merge priority order.
const MODULES: &[&str] = &["price", "summaryDetail", "defaultKeyStatistics", "financialData"];

#[derive(Error, Debug)]
pub enum YahooError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("No data found for {0}")]
    NotFound(String),

    #[error("Yahoo returned an error for {symbol}: {message}")]
    Upstream { symbol: String, message: String },

    #[error("Unexpected status {0}")]
    Status(StatusCode),

    #[error("Rate limited after {0} attempts")]
    RateLimited(u32),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<YahooError> for ValuationError {
    fn from(err: YahooError) -> Self {
        ValuationError::Provider(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl YahooConfig {
    /// Reads `YAHOO_BASE_URL` and `YAHOO_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            base_url: lookup("YAHOO_BASE_URL").unwrap_or(defaults.base_url),
            timeout: lookup("YAHOO_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        }
    }
}

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    config: YahooConfig,
}

impl YahooFinanceClient {
    pub fn new(config: YahooConfig) -> Result<Self, YahooError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: YahooConfig) -> Self {
        Self { client, config }
    }

    fn quote_summary_url(&self, symbol: &str) -> String {
        format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.config.base_url.trim_end_matches('/'),
            symbol,
            MODULES.join(",")
        )
    }

    /// Send a GET with automatic 429 retry.
    async fn get_json(&self, url: &str) -> Result<Value, YahooError> {
        for attempt in 1..=self.config.max_attempts {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(
                    "Yahoo 429 rate limited, waiting {:?} before retry {}/{}",
                    self.config.retry_backoff,
                    attempt,
                    self.config.max_attempts
                );
                tokio::time::sleep(self.config.retry_backoff).await;
                continue;
            }

            // quoteSummary reports unknown tickers as 404 with an error body.
            if !status.is_success() && status != StatusCode::NOT_FOUND {
                return Err(YahooError::Status(status));
            }

            return response
                .json::<Value>()
                .await
                .map_err(|e| YahooError::InvalidResponse(e.to_string()));
        }

        Err(YahooError::RateLimited(self.config.max_attempts))
    }

    /// Fundamentals for `symbol`, flattened into a single JSON object.
    pub async fn get_fundamentals(&self, symbol: &str) -> Result<Value, YahooError> {
        let symbol = symbol.trim().to_uppercase();
        let url = self.quote_summary_url(&symbol);
        tracing::debug!(%symbol, "fetching Yahoo quoteSummary");

        let body = self.get_json(&url).await?;
        flatten_quote_summary(&body, &symbol)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch_raw(&self, ticker: &str) -> Result<Value, ValuationError> {
        Ok(self.get_fundamentals(ticker).await?)
    }

    fn provider_name(&self) -> &'static str {
        "yahoo"
    }
}

/// Merges the `quoteSummary` module objects into one map. Earlier modules in
/// [`MODULES`] win when a key appears twice.
pub fn flatten_quote_summary(body: &Value, symbol: &str) -> Result<Value, YahooError> {
    let summary = body
        .get("quoteSummary")
        .ok_or_else(|| YahooError::InvalidResponse("missing quoteSummary".to_string()))?;

    if let Some(error) = summary.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(YahooError::Upstream {
            symbol: symbol.to_string(),
            message,
        });
    }

    let result = summary
        .get("result")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .ok_or_else(|| YahooError::NotFound(symbol.to_string()))?;

    let mut fields = Map::new();
    for module in MODULES {
        let Some(entries) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in entries {
            if !fields.contains_key(key) {
                fields.insert(key.clone(), value.clone());
            }
        }
    }

    if fields.is_empty() {
        return Err(YahooError::NotFound(symbol.to_string()));
    }
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_body() -> Value {
        json!({
            "quoteSummary": {
                "result": [{
                    "price": {
                        "longName": "The Coca-Cola Company",
                        "currency": "USD",
                        "regularMarketPrice": { "raw": 62.1, "fmt": "62.10" }
                    },
                    "summaryDetail": {
                        "trailingPE": { "raw": 25.4, "fmt": "25.40" },
                        "beta": { "raw": 0.58, "fmt": "0.58" }
                    },
                    "defaultKeyStatistics": {
                        "trailingEps": { "raw": 2.47, "fmt": "2.47" },
                        "beta": { "raw": 0.61, "fmt": "0.61" }
                    },
                    "financialData": {
                        "currentPrice": { "raw": 62.0, "fmt": "62.00" },
                        "returnOnEquity": { "raw": 0.39, "fmt": "39.00%" },
                        "freeCashflow": { "raw": 9_700_000_000.0, "fmt": "9.7B" },
                        "totalDebt": {},
                        "financialCurrency": "USD"
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_flatten_merges_modules() {
        let flat = flatten_quote_summary(&sample_body(), "KO").unwrap();
        assert_eq!(flat["longName"], "The Coca-Cola Company");
        assert_eq!(flat["trailingPE"]["raw"], 25.4);
        assert_eq!(flat["returnOnEquity"]["raw"], 0.39);
        assert!(flat.get("totalDebt").is_some());
    }

    #[test]
    fn test_flatten_earlier_module_wins() {
        let flat = flatten_quote_summary(&sample_body(), "KO").unwrap();
        // summaryDetail comes before defaultKeyStatistics.
        assert_eq!(flat["beta"]["raw"], 0.58);
    }

    #[test]
    fn test_flatten_upstream_error() {
        let body = json!({
            "quoteSummary": {
                "result": null,
                "error": { "code": "Not Found", "description": "Quote not found for ticker symbol: ZZZZ" }
            }
        });
        let err = flatten_quote_summary(&body, "ZZZZ").unwrap_err();
        assert!(matches!(err, YahooError::Upstream { .. }));
        assert!(err.to_string().contains("ZZZZ"));
    }

    #[test]
    fn test_flatten_empty_result_is_not_found() {
        let body = json!({ "quoteSummary": { "result": [], "error": null } });
        assert!(matches!(
            flatten_quote_summary(&body, "AAPL"),
            Err(YahooError::NotFound(_))
        ));

        let body = json!({ "quoteSummary": { "result": [{}], "error": null } });
        assert!(matches!(
            flatten_quote_summary(&body, "AAPL"),
            Err(YahooError::NotFound(_))
        ));
    }

    #[test]
    fn test_flatten_rejects_unexpected_shape() {
        assert!(matches!(
            flatten_quote_summary(&json!({ "chart": {} }), "AAPL"),
            Err(YahooError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_url_includes_all_modules() {
        let client = YahooFinanceClient::with_client(
            Client::new(),
            YahooConfig {
                base_url: "http://localhost:9000/".to_string(),
                ..YahooConfig::default()
            },
        );
        assert_eq!(
            client.quote_summary_url("KO"),
            "http://localhost:9000/v10/finance/quoteSummary/KO?modules=price,summaryDetail,defaultKeyStatistics,financialData"
        );
    }

    #[test]
    fn test_config_from_lookup() {
        let config = YahooConfig::from_lookup(|_| None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.max_attempts, 3);

        let config = YahooConfig::from_lookup(|key| match key {
            "YAHOO_BASE_URL" => Some("http://localhost:9000".to_string()),
            "YAHOO_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));

        let config = YahooConfig::from_lookup(|key| {
            (key == "YAHOO_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    // -----------------------------------------------------------------------
    // HTTP behaviour against a local mock server
    // -----------------------------------------------------------------------

    const KO_PATH: &str = "/v10/finance/quoteSummary/KO";

    fn client_for(server: &MockServer, max_attempts: u32) -> YahooFinanceClient {
        YahooFinanceClient::new(YahooConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            max_attempts,
            retry_backoff: Duration::ZERO,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_flattens_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KO_PATH))
            .and(query_param(
                "modules",
                "price,summaryDetail,defaultKeyStatistics,financialData",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 3);
        let raw = client.fetch_raw(" ko ").await.unwrap();
        assert_eq!(raw["returnOnEquity"]["raw"], 0.39);
        assert_eq!(client.provider_name(), "yahoo");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KO_PATH))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(KO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 3);
        let raw = client.get_fundamentals("KO").await.unwrap();
        assert_eq!(raw["longName"], "The Coca-Cola Company");
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KO_PATH))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, 2);
        let err = client.get_fundamentals("KO").await.unwrap_err();
        assert!(matches!(err, YahooError::RateLimited(2)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_not_found_body_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/ZZZZ"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "quoteSummary": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "Quote not found for ticker symbol: ZZZZ" }
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, 3);
        let err = client.get_fundamentals("ZZZZ").await.unwrap_err();
        assert!(matches!(err, YahooError::Upstream { .. }), "{:?}", err);

        let err = client.fetch_raw("ZZZZ").await.unwrap_err();
        assert!(matches!(err, ValuationError::Provider(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KO_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 3);
        let err = client.get_fundamentals("KO").await.unwrap_err();
        assert!(
            matches!(err, YahooError::Status(StatusCode::INTERNAL_SERVER_ERROR)),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_error_converts_to_provider_error() {
        let err: ValuationError = YahooError::NotFound("AAPL".to_string()).into();
        assert!(matches!(err, ValuationError::Provider(_)));
    }
}
