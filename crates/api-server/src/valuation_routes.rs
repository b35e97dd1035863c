//! Valuation API Routes
//!
//! Fetches fundamentals for a ticker and runs the valuation calculator.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use fundamental_analysis::MetricsNormalizer;
use serde::{Deserialize, Serialize};
use valuation_core::{DisplayMap, MetricsRecord, ValuationParams, ValuationResult};

use crate::{valuation_err, ApiResponse, AppError, AppState};

pub const MIN_HORIZON_YEARS: u32 = 1;
pub const MAX_HORIZON_YEARS: u32 = 30;
const MAX_SYMBOL_LEN: usize = 12;

/// Slider values; anything omitted takes the engine default.
#[derive(Debug, Default, Deserialize)]
pub struct ValuationQuery {
    pub growth_rate: Option<f64>,
    pub discount_rate: Option<f64>,
    pub horizon_years: Option<u32>,
}

impl ValuationQuery {
    pub fn into_params(self) -> Result<ValuationParams, AppError> {
        let defaults = ValuationParams::default();
        let params = ValuationParams::new(
            self.growth_rate.unwrap_or(defaults.growth_rate),
            self.discount_rate.unwrap_or(defaults.discount_rate),
            self.horizon_years.unwrap_or(defaults.horizon_years),
        );
        validate_params(&params)?;
        Ok(params)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SymbolValuation {
    pub symbol: String,
    pub provider: String,
    pub params: ValuationParams,
    pub metrics: MetricsRecord,
    pub valuation: ValuationResult,
    pub display: DisplayMap,
}

pub fn valuation_routes() -> Router<AppState> {
    Router::new().route("/api/valuation/:symbol", get(get_valuation))
}

async fn get_valuation(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ValuationQuery>,
) -> Result<Json<ApiResponse<SymbolValuation>>, AppError> {
    let params = query.into_params()?;
    let result = valuate_symbol(&state, &symbol, params).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub(crate) fn validate_params(params: &ValuationParams) -> Result<(), AppError> {
    if !(MIN_HORIZON_YEARS..=MAX_HORIZON_YEARS).contains(&params.horizon_years) {
        return Err(AppError::bad_request(format!(
            "horizon_years must be between {} and {}",
            MIN_HORIZON_YEARS, MAX_HORIZON_YEARS
        )));
    }
    Ok(())
}

pub(crate) fn normalize_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AppError::bad_request("symbol must not be empty"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(AppError::bad_request(format!(
            "symbol '{}' is longer than {} characters",
            symbol, MAX_SYMBOL_LEN
        )));
    }
    if let Some(ch) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
    {
        return Err(AppError::bad_request(format!(
            "symbol '{}' contains invalid character '{}'",
            symbol, ch
        )));
    }
    Ok(symbol)
}

/// Fetch, normalize and evaluate one symbol.
pub(crate) async fn valuate_symbol(
    state: &AppState,
    raw_symbol: &str,
    params: ValuationParams,
) -> Result<SymbolValuation, AppError> {
    let symbol = normalize_symbol(raw_symbol)?;

    let raw = state
        .market_data
        .fetch_raw(&symbol)
        .await
        .map_err(|e| valuation_err(&format!("Failed to fetch fundamentals for {symbol}"), e))?;

    let metrics = MetricsNormalizer::new()
        .normalize(&raw, &symbol)
        .map_err(|e| valuation_err(&format!("Malformed fundamentals for {symbol}"), e))?;

    let valuation = state
        .engine
        .evaluate(&metrics, &params)
        .map_err(|e| valuation_err(&format!("Cannot value {symbol}"), e))?;

    tracing::info!(
        %symbol,
        moat_score = valuation.moat_score,
        is_stable = valuation.is_stable,
        intrinsic_value = ?valuation.intrinsic_value,
        "valuation served"
    );

    let display = DisplayMap::from_parts(&metrics, &valuation);
    Ok(SymbolValuation {
        symbol,
        provider: state.market_data.provider_name().to_string(),
        params,
        metrics,
        valuation,
        display,
    })
}
