use async_trait::async_trait;

use crate::{CoreResult, DisplayMap};

/// Source of raw fundamentals for a ticker.
///
/// Implementations return the provider payload flattened into one JSON object;
/// any field may be missing. Network and unknown-ticker failures map to
/// [`crate::ValuationError::Provider`].
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_raw(&self, ticker: &str) -> CoreResult<serde_json::Value>;

    fn provider_name(&self) -> &'static str;
}

/// Turns display data into natural-language commentary (an LLM, usually).
#[async_trait]
pub trait AssessmentProvider: Send + Sync {
    async fn assess(&self, ticker: &str, data: &DisplayMap) -> CoreResult<String>;

    /// Compare several tickers at once.
    async fn screen(&self, rows: &[DisplayMap]) -> CoreResult<String>;
}
