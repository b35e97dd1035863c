use serde::{Deserialize, Serialize};
use valuation_core::{
    MetricsRecord, ValuationError, ValuationMethod, ValuationParams, ValuationResult,
};

/// How the stability flag is decided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StabilityRule {
    /// Stable when beta is strictly below `max`.
    Beta { max: f64 },
    /// Stable when free cash flow is known and positive.
    PositiveFreeCashFlow,
}

/// Which intrinsic-value formula the engine may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrinsicMethod {
    /// EPS growth when EPS is known, otherwise discounted free cash flow.
    Auto,
    EarningsGrowth,
    DiscountedCashFlow,
}

/// Heuristic thresholds for the moat and stability checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// ROE strictly above this earns one moat point.
    pub moat_roe_threshold: f64,
    /// Beta strictly below this earns one moat point.
    pub moat_beta_threshold: f64,
    pub stability_rule: StabilityRule,
    pub intrinsic_method: IntrinsicMethod,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            moat_roe_threshold: 0.15,
            moat_beta_threshold: 1.0,
            stability_rule: StabilityRule::Beta { max: 1.2 },
            intrinsic_method: IntrinsicMethod::Auto,
        }
    }
}

/// Stateless valuation calculator. Every call depends only on its arguments
/// and the engine's config.
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: ValuationConfig,
}

impl ValuationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValuationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        metrics: &MetricsRecord,
        params: &ValuationParams,
    ) -> Result<ValuationResult, ValuationError> {
        if !params.growth_rate.is_finite() || !params.discount_rate.is_finite() {
            return Err(ValuationError::Domain(format!(
                "growth rate ({}) and discount rate ({}) must be finite",
                params.growth_rate, params.discount_rate
            )));
        }

        let moat_score = self.moat_score(metrics);
        let is_stable = self.is_stable(metrics);
        let estimate = self.intrinsic_value(metrics, params)?;

        tracing::debug!(
            ticker = %metrics.ticker,
            moat_score,
            is_stable,
            intrinsic_value = ?estimate.map(|(value, _)| value),
            "valuation computed"
        );

        Ok(ValuationResult {
            moat_score,
            is_stable,
            intrinsic_value: estimate.map(|(value, _)| value),
            method: estimate.map(|(_, method)| method),
        })
    }

    /// 0..=2: one point for strong ROE, one for low beta. Unknown ROE scores nothing.
    pub fn moat_score(&self, metrics: &MetricsRecord) -> u8 {
        let mut score: u8 = 0;
        if metrics
            .return_on_equity
            .map_or(false, |roe| roe > self.config.moat_roe_threshold)
        {
            score += 1;
        }
        if metrics.beta < self.config.moat_beta_threshold {
            score += 1;
        }
        score.min(ValuationResult::MAX_MOAT_SCORE)
    }

    pub fn is_stable(&self, metrics: &MetricsRecord) -> bool {
        match self.config.stability_rule {
            StabilityRule::Beta { max } => metrics.beta < max,
            StabilityRule::PositiveFreeCashFlow => metrics.free_cash_flow.map_or(false, |fcf| fcf > 0.0),
        }
    }

    fn intrinsic_value(
        &self,
        metrics: &MetricsRecord,
        params: &ValuationParams,
    ) -> Result<Option<(f64, ValuationMethod)>, ValuationError> {
        let from_eps = || -> Result<Option<(f64, ValuationMethod)>, ValuationError> {
            match metrics.trailing_eps {
                Some(eps) => {
                    let value = gordon_growth_value(eps, params.growth_rate, params.discount_rate)?;
                    Ok(Some((value, ValuationMethod::EarningsGrowth)))
                }
                None => Ok(None),
            }
        };
        let from_fcf = || -> Result<Option<(f64, ValuationMethod)>, ValuationError> {
            match (metrics.free_cash_flow, metrics.current_price) {
                (Some(fcf), Some(_)) => {
                    let value = discounted_cash_flow_value(
                        fcf,
                        params.growth_rate,
                        params.discount_rate,
                        params.horizon_years,
                    )?;
                    Ok(Some((value, ValuationMethod::DiscountedCashFlow)))
                }
                _ => Ok(None),
            }
        };

        match self.config.intrinsic_method {
            IntrinsicMethod::EarningsGrowth => from_eps(),
            IntrinsicMethod::DiscountedCashFlow => from_fcf(),
            IntrinsicMethod::Auto => match from_eps()? {
                Some(estimate) => Ok(Some(estimate)),
                None => from_fcf(),
            },
        }
    }
}

/// Gordon growth on EPS: `eps * (1 + g) / (d - g)`, rounded to cents.
///
/// The discount rate must exceed the growth rate; otherwise the formula flips
/// sign or divides by zero.
pub fn gordon_growth_value(eps: f64, growth_rate: f64, discount_rate: f64) -> Result<f64, ValuationError> {
    if discount_rate <= growth_rate {
        return Err(ValuationError::Domain(format!(
            "discount rate ({}) must exceed growth rate ({})",
            discount_rate, growth_rate
        )));
    }
    finite_cents(
        eps * (1.0 + growth_rate) / (discount_rate - growth_rate),
        "earnings growth value",
    )
}

/// Free cash flow grown for `years` at `g`, discounted back at `d`, rounded to cents.
pub fn discounted_cash_flow_value(
    free_cash_flow: f64,
    growth_rate: f64,
    discount_rate: f64,
    years: u32,
) -> Result<f64, ValuationError> {
    if 1.0 + discount_rate <= 0.0 {
        return Err(ValuationError::Domain(format!(
            "discount rate ({}) must be greater than -100%",
            discount_rate
        )));
    }
    let exponent = i32::try_from(years)
        .map_err(|_| ValuationError::Domain(format!("horizon of {} years is too large", years)))?;
    let future_value = free_cash_flow * (1.0 + growth_rate).powi(exponent);
    let present_value = future_value / (1.0 + discount_rate).powi(exponent);
    finite_cents(present_value, "discounted cash flow value")
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to cents and rejects anything that is no longer a finite number.
/// Infinity would serialize as JSON `null` and read as unknown.
fn finite_cents(value: f64, what: &str) -> Result<f64, ValuationError> {
    let rounded = round_to_cents(value);
    if rounded.is_finite() {
        Ok(rounded)
    } else {
        Err(ValuationError::Domain(format!("{} overflowed ({})", what, value)))
    }
}
