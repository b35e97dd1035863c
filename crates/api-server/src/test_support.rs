//! In-memory collaborators for router tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::to_bytes, response::Response, Router};
use fundamental_analysis::ValuationEngine;
use serde_json::{json, Value};
use valuation_core::{AssessmentProvider, DisplayMap, MarketDataProvider, ValuationError};

use crate::{build_router, AppState, ServerConfig};

/// Serves canned payloads: `KO` is complete, `SPARSE` has nothing numeric,
/// `BROKEN` is not a field map, anything else is an unknown ticker.
pub struct StubMarketData;

#[async_trait]
impl MarketDataProvider for StubMarketData {
    async fn fetch_raw(&self, ticker: &str) -> Result<Value, ValuationError> {
        match ticker {
            "KO" => Ok(json!({
                "longName": "The Coca-Cola Company",
                "trailingPE": 25.1,
                "returnOnEquity": 0.2,
                "trailingEps": 10.0,
                "totalDebt": 4.2e10,
                "currentPrice": 60.5,
                "beta": 0.8,
                "currency": "USD",
            })),
            "SPARSE" => Ok(json!({ "shortName": "Sparse Corp" })),
            "BROKEN" => Ok(json!(["not", "a", "map"])),
            other => Err(ValuationError::Provider(format!("no data for {other}"))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

pub struct StubAssessor;

#[async_trait]
impl AssessmentProvider for StubAssessor {
    async fn assess(&self, ticker: &str, data: &DisplayMap) -> Result<String, ValuationError> {
        Ok(format!(
            "{} looks wonderful at {}",
            ticker,
            data.get("intrinsic_value").unwrap_or_default()
        ))
    }

    async fn screen(&self, rows: &[DisplayMap]) -> Result<String, ValuationError> {
        let tickers: Vec<&str> = rows.iter().filter_map(|row| row.get("ticker")).collect();
        Ok(format!("screened {}", tickers.join(",")))
    }
}

fn app_with(assessor: Option<Arc<dyn AssessmentProvider>>) -> Router {
    let state = AppState {
        market_data: Arc::new(StubMarketData),
        assessor,
        engine: Arc::new(ValuationEngine::new()),
    };
    build_router(state, &ServerConfig::default())
}

pub fn test_app() -> Router {
    app_with(Some(Arc::new(StubAssessor)))
}

pub fn test_app_without_assessor() -> Router {
    app_with(None)
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
