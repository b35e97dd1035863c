use serde::{Deserialize, Serialize};

/// Beta assumed when the provider does not report one.
pub const DEFAULT_BETA: f64 = 1.0;

/// Normalized fundamentals snapshot for one ticker.
///
/// `None` is the "unknown" marker: a field the provider did not report. It is
/// never coerced to zero, and every formula that depends on it yields unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    pub price_to_earnings: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub total_debt: Option<f64>,
    pub current_price: Option<f64>,
    pub beta: f64,
    pub currency: Option<String>,
}

impl MetricsRecord {
    /// A record with every optional field unknown and the default beta.
    pub fn unknown(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: None,
            price_to_earnings: None,
            return_on_equity: None,
            free_cash_flow: None,
            trailing_eps: None,
            total_debt: None,
            current_price: None,
            beta: DEFAULT_BETA,
            currency: None,
        }
    }

    /// Names of the optional fields that are unknown, in declaration order.
    pub fn unknown_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.price_to_earnings.is_none() {
            missing.push("price_to_earnings");
        }
        if self.return_on_equity.is_none() {
            missing.push("return_on_equity");
        }
        if self.free_cash_flow.is_none() {
            missing.push("free_cash_flow");
        }
        if self.trailing_eps.is_none() {
            missing.push("trailing_eps");
        }
        if self.total_debt.is_none() {
            missing.push("total_debt");
        }
        if self.current_price.is_none() {
            missing.push("current_price");
        }
        if self.currency.is_none() {
            missing.push("currency");
        }
        missing
    }
}

/// Caller-supplied valuation inputs (typically UI slider values).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationParams {
    #[serde(default = "ValuationParams::default_growth_rate")]
    pub growth_rate: f64,
    #[serde(default = "ValuationParams::default_discount_rate")]
    pub discount_rate: f64,
    #[serde(default = "ValuationParams::default_horizon_years")]
    pub horizon_years: u32,
}

impl ValuationParams {
    pub const DEFAULT_GROWTH_RATE: f64 = 0.08;
    pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;
    pub const DEFAULT_HORIZON_YEARS: u32 = 5;

    pub fn new(growth_rate: f64, discount_rate: f64, horizon_years: u32) -> Self {
        Self {
            growth_rate,
            discount_rate,
            horizon_years,
        }
    }

    fn default_growth_rate() -> f64 {
        Self::DEFAULT_GROWTH_RATE
    }

    fn default_discount_rate() -> f64 {
        Self::DEFAULT_DISCOUNT_RATE
    }

    fn default_horizon_years() -> u32 {
        Self::DEFAULT_HORIZON_YEARS
    }
}

impl Default for ValuationParams {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_GROWTH_RATE,
            Self::DEFAULT_DISCOUNT_RATE,
            Self::DEFAULT_HORIZON_YEARS,
        )
    }
}

/// Formula that produced an intrinsic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    /// Gordon growth on trailing EPS.
    EarningsGrowth,
    /// Finite-horizon discounted free cash flow.
    DiscountedCashFlow,
}

impl ValuationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValuationMethod::EarningsGrowth => "earnings_growth",
            ValuationMethod::DiscountedCashFlow => "discounted_cash_flow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "earnings_growth" => Some(ValuationMethod::EarningsGrowth),
            "discounted_cash_flow" => Some(ValuationMethod::DiscountedCashFlow),
            _ => None,
        }
    }
}

/// Derived valuation for one (record, params) pair. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub moat_score: u8,
    pub is_stable: bool,
    pub intrinsic_value: Option<f64>,
    #[serde(default)]
    pub method: Option<ValuationMethod>,
}

impl ValuationResult {
    pub const MAX_MOAT_SCORE: u8 = 2;

    pub fn is_computed(&self) -> bool {
        self.intrinsic_value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_record_has_default_beta() {
        let record = MetricsRecord::unknown("AAPL");
        assert_eq!(record.beta, DEFAULT_BETA);
        assert!(record.current_price.is_none());
        assert_eq!(record.unknown_fields().len(), 8);
    }

    #[test]
    fn test_params_defaults() {
        let params = ValuationParams::default();
        assert_eq!(params.growth_rate, 0.08);
        assert_eq!(params.discount_rate, 0.10);
        assert_eq!(params.horizon_years, 5);
    }

    #[test]
    fn test_params_deserialize_fills_missing_fields() {
        let params: ValuationParams =
            serde_json::from_str(r#"{"discount_rate": 0.12}"#).unwrap();
        assert_eq!(params.discount_rate, 0.12);
        assert_eq!(params.growth_rate, 0.08);
        assert_eq!(params.horizon_years, 5);
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(
            ValuationMethod::parse("Earnings_Growth"),
            Some(ValuationMethod::EarningsGrowth)
        );
        assert_eq!(ValuationMethod::parse("gordon"), None);
        assert_eq!(
            ValuationMethod::parse(ValuationMethod::DiscountedCashFlow.as_str()),
            Some(ValuationMethod::DiscountedCashFlow)
        );
    }
}
