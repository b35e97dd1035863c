//! Assessment API Routes
//!
//! LLM commentary for a single ticker, and multi-ticker screening.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use valuation_core::{AssessmentProvider, DisplayMap, ValuationParams};

use crate::valuation_routes::{valuate_symbol, validate_params, SymbolValuation, ValuationQuery};
use crate::{valuation_err, ApiResponse, AppError, AppState};

pub const MAX_SCREEN_SYMBOLS: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub valuation: SymbolValuation,
    pub assessment: String,
}

#[derive(Debug, Deserialize)]
pub struct ScreenRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub params: ValuationParams,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScreenFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScreenResponse {
    pub results: Vec<SymbolValuation>,
    pub failures: Vec<ScreenFailure>,
    /// Present only when an assessor is configured and at least one symbol
    /// was valued.
    pub screening: Option<String>,
}

pub fn assessment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/assessment/:symbol", post(assess_symbol))
        .route("/api/screen", post(screen_symbols))
}

fn require_assessor(state: &AppState) -> Result<Arc<dyn AssessmentProvider>, AppError> {
    state.assessor.clone().ok_or_else(|| {
        AppError::with_status(
            StatusCode::SERVICE_UNAVAILABLE,
            anyhow::anyhow!("Assessment is not configured (set OPENAI_API_KEY)"),
        )
    })
}

async fn assess_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ValuationQuery>,
) -> Result<Json<ApiResponse<AssessmentResponse>>, AppError> {
    let assessor = require_assessor(&state)?;
    let params = query.into_params()?;
    let valuation = valuate_symbol(&state, &symbol, params).await?;

    let assessment = assessor
        .assess(&valuation.symbol, &valuation.display)
        .await
        .map_err(|e| valuation_err(&format!("Assessment failed for {}", valuation.symbol), e))?;

    Ok(Json(ApiResponse::success(AssessmentResponse {
        valuation,
        assessment,
    })))
}

async fn screen_symbols(
    State(state): State<AppState>,
    Json(request): Json<ScreenRequest>,
) -> Result<Json<ApiResponse<ScreenResponse>>, AppError> {
    if request.symbols.is_empty() {
        return Err(AppError::bad_request("symbols must not be empty"));
    }
    if request.symbols.len() > MAX_SCREEN_SYMBOLS {
        return Err(AppError::bad_request(format!(
            "at most {} symbols can be screened at once, got {}",
            MAX_SCREEN_SYMBOLS,
            request.symbols.len()
        )));
    }
    validate_params(&request.params)?;

    let params = request.params;
    let outcomes = join_all(
        request
            .symbols
            .iter()
            .map(|symbol| valuate_symbol(&state, symbol, params)),
    )
    .await;

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (symbol, outcome) in request.symbols.iter().zip(outcomes) {
        match outcome {
            Ok(valuation) => results.push(valuation),
            Err(e) => {
                tracing::warn!(%symbol, status = %e.status(), "screen entry skipped");
                failures.push(ScreenFailure {
                    symbol: symbol.trim().to_uppercase(),
                    error: e.message(),
                });
            }
        }
    }

    let screening = match (&state.assessor, results.is_empty()) {
        (Some(assessor), false) => {
            let rows: Vec<DisplayMap> = results.iter().map(|r| r.display.clone()).collect();
            Some(
                assessor
                    .screen(&rows)
                    .await
                    .map_err(|e| valuation_err("Screening failed", e))?,
            )
        }
        _ => None,
    };

    Ok(Json(ApiResponse::success(ScreenResponse {
        results,
        failures,
        screening,
    })))
}
