//! Flat key/value rendering handed to presentation and prompt builders.
//!
//! Unknown values become the literal [`UNKNOWN_PLACEHOLDER`]; numbers use the
//! shortest float formatting that parses back to the same value, so a map can
//! be turned back into records without confusing "unknown" with zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::{MetricsRecord, ValuationMethod, ValuationResult};

pub const UNKNOWN_PLACEHOLDER: &str = "N/A";

const YES: &str = "Yes";
const NO: &str = "No";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayMap(BTreeMap<String, String>);

impl DisplayMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics and valuation merged into one map.
    pub fn from_parts(metrics: &MetricsRecord, valuation: &ValuationResult) -> Self {
        let mut map = metrics.to_display_map();
        map.extend(valuation.to_display_map());
        map
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn extend(&mut self, other: DisplayMap) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn put_number(&mut self, key: &str, value: Option<f64>) {
        self.insert(key, render_number(value));
    }

    fn put_text(&mut self, key: &str, value: Option<&str>) {
        self.insert(key, value.unwrap_or(UNKNOWN_PLACEHOLDER));
    }

    fn required(&self, key: &str) -> Result<&str, ValuationError> {
        self.get(key)
            .ok_or_else(|| ValuationError::DataFormat(format!("missing display field '{}'", key)))
    }

    fn number(&self, key: &str) -> Result<Option<f64>, ValuationError> {
        parse_number(key, self.required(key)?)
    }

    fn text(&self, key: &str) -> Result<Option<String>, ValuationError> {
        let raw = self.required(key)?;
        if raw == UNKNOWN_PLACEHOLDER {
            Ok(None)
        } else {
            Ok(Some(raw.to_string()))
        }
    }
}

impl FromIterator<(String, String)> for DisplayMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn render_number(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => UNKNOWN_PLACEHOLDER.to_string(),
    }
}

fn parse_number(key: &str, raw: &str) -> Result<Option<f64>, ValuationError> {
    if raw == UNKNOWN_PLACEHOLDER {
        return Ok(None);
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| {
            ValuationError::DataFormat(format!("field '{}' is not a finite number: '{}'", key, raw))
        })
}

impl MetricsRecord {
    pub fn to_display_map(&self) -> DisplayMap {
        let mut map = DisplayMap::new();
        map.insert("ticker", self.ticker.clone());
        map.put_text("name", self.name.as_deref());
        map.put_number("price_to_earnings", self.price_to_earnings);
        map.put_number("return_on_equity", self.return_on_equity);
        map.put_number("free_cash_flow", self.free_cash_flow);
        map.put_number("trailing_eps", self.trailing_eps);
        map.put_number("total_debt", self.total_debt);
        map.put_number("current_price", self.current_price);
        map.put_number("beta", Some(self.beta));
        map.put_text("currency", self.currency.as_deref());
        map
    }

    pub fn from_display_map(map: &DisplayMap) -> Result<Self, ValuationError> {
        let ticker = map.required("ticker")?.to_string();
        if ticker.is_empty() || ticker == UNKNOWN_PLACEHOLDER {
            return Err(ValuationError::DataFormat("ticker must be present".to_string()));
        }
        let beta = map
            .number("beta")?
            .ok_or_else(|| ValuationError::DataFormat("beta must be numeric".to_string()))?;

        Ok(Self {
            ticker,
            name: map.text("name")?,
            price_to_earnings: map.number("price_to_earnings")?,
            return_on_equity: map.number("return_on_equity")?,
            free_cash_flow: map.number("free_cash_flow")?,
            trailing_eps: map.number("trailing_eps")?,
            total_debt: map.number("total_debt")?,
            current_price: map.number("current_price")?,
            beta,
            currency: map.text("currency")?,
        })
    }
}

impl ValuationResult {
    pub fn to_display_map(&self) -> DisplayMap {
        let mut map = DisplayMap::new();
        map.insert("moat_score", self.moat_score.to_string());
        map.insert("is_stable", if self.is_stable { YES } else { NO });
        map.put_number("intrinsic_value", self.intrinsic_value);
        map.put_text("method", self.method.as_ref().map(ValuationMethod::as_str));
        map
    }

    pub fn from_display_map(map: &DisplayMap) -> Result<Self, ValuationError> {
        let raw_moat = map.required("moat_score")?;
        let moat_score = raw_moat
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|score| *score <= Self::MAX_MOAT_SCORE)
            .ok_or_else(|| {
                ValuationError::DataFormat(format!("moat_score out of range: '{}'", raw_moat))
            })?;

        let is_stable = match map.required("is_stable")? {
            YES => true,
            NO => false,
            other => {
                return Err(ValuationError::DataFormat(format!(
                    "is_stable must be Yes or No, got '{}'",
                    other
                )))
            }
        };

        let method = match map.text("method")? {
            Some(raw) => Some(ValuationMethod::parse(&raw).ok_or_else(|| {
                ValuationError::DataFormat(format!("unknown valuation method '{}'", raw))
            })?),
            None => None,
        };

        Ok(Self {
            moat_score,
            is_stable,
            intrinsic_value: map.number("intrinsic_value")?,
            method,
        })
    }
}
