//! Valuation calculator: normalizes raw provider fundamentals into a
//! [`MetricsRecord`] and derives moat score, stability and intrinsic value.

mod engine;
mod normalizer;


pub use engine::{
    discounted_cash_flow_value, gordon_growth_value, round_to_cents, IntrinsicMethod,
    StabilityRule, ValuationConfig, ValuationEngine,
};
pub use normalizer::MetricsNormalizer;

use valuation_core::{MetricsRecord, ValuationError, ValuationParams, ValuationResult};

/// Normalize and evaluate in one step with the default normalizer.
pub fn analyze(
    engine: &ValuationEngine,
    raw: &serde_json::Value,
    ticker: &str,
    params: &ValuationParams,
) -> Result<(MetricsRecord, ValuationResult), ValuationError> {
    let metrics = MetricsNormalizer::new().normalize(raw, ticker)?;
    let valuation = engine.evaluate(&metrics, params)?;
    Ok((metrics, valuation))
}
