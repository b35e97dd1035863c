use serde_json::{Map, Value};
use valuation_core::{MetricsRecord, ValuationError, DEFAULT_BETA, UNKNOWN_PLACEHOLDER};

const PE_KEYS: &[&str] = &["trailingPE"];
const ROE_KEYS: &[&str] = &["returnOnEquity"];
const FCF_KEYS: &[&str] = &["freeCashflow"];
const EPS_KEYS: &[&str] = &["trailingEps"];
const BETA_KEYS: &[&str] = &["beta"];
const DEBT_KEYS: &[&str] = &["totalDebt"];
const PRICE_KEYS: &[&str] = &["currentPrice", "regularMarketPrice"];
const CURRENCY_KEYS: &[&str] = &["currency", "financialCurrency"];
const NAME_KEYS: &[&str] = &["longName", "shortName"];

/// Text some providers send in place of a missing value.
const UNKNOWN_SENTINELS: &[&str] = &[UNKNOWN_PLACEHOLDER, "Ukendt"];

/// Maps a provider field map onto a [`MetricsRecord`].
///
/// Missing or unusable fields become `None`; only a payload that is not a
/// JSON object (or an empty ticker) is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsNormalizer;

impl MetricsNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: &Value, ticker: &str) -> Result<MetricsRecord, ValuationError> {
        let fields = raw.as_object().ok_or_else(|| {
            ValuationError::DataFormat(format!(
                "expected a field map for {}, got {}",
                ticker,
                json_kind(raw)
            ))
        })?;

        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(ValuationError::DataFormat("ticker must not be empty".to_string()));
        }

        let record = MetricsRecord {
            name: text(fields, NAME_KEYS),
            price_to_earnings: number(fields, PE_KEYS),
            return_on_equity: number(fields, ROE_KEYS),
            free_cash_flow: number(fields, FCF_KEYS),
            trailing_eps: number(fields, EPS_KEYS),
            total_debt: number(fields, DEBT_KEYS),
            current_price: number(fields, PRICE_KEYS),
            beta: number(fields, BETA_KEYS).unwrap_or(DEFAULT_BETA),
            currency: text(fields, CURRENCY_KEYS),
            ticker,
        };

        let unknown = record.unknown_fields();
        if !unknown.is_empty() {
            tracing::debug!(
                ticker = %record.ticker,
                unknown = ?unknown,
                "normalized with unknown fields"
            );
        }

        Ok(record)
    }
}

fn number(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| fields.get(*key).and_then(numeric_value))
}

fn text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        fields
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty() && !is_sentinel(s))
            .map(str::to_string)
    })
}

/// Plain numbers, numeric strings, and Yahoo's `{"raw": .., "fmt": ..}` envelope.
fn numeric_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if is_sentinel(s.trim()) => None,
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(envelope) => envelope.get("raw").and_then(numeric_value),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn is_sentinel(s: &str) -> bool {
    UNKNOWN_SENTINELS.iter().any(|sentinel| s.eq_ignore_ascii_case(sentinel))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
