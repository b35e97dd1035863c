use std::env;

use anyhow::{bail, Context, Result};
use fundamental_analysis::{IntrinsicMethod, StabilityRule, ValuationConfig};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub valuation: ValuationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
            valuation: ValuationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_f64 = |key: &str, default: f64| -> Result<f64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("{key} must be a number, got '{raw}'")),
                None => Ok(default),
            }
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port, got '{raw}'"))?,
            None => defaults.port,
        };

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let base = defaults.valuation;
        let stability_rule = match lookup("STABILITY_RULE").as_deref().map(str::trim) {
            None | Some("beta") => {
                let default_max = match base.stability_rule {
                    StabilityRule::Beta { max } => max,
                    StabilityRule::PositiveFreeCashFlow => 1.2,
                };
                StabilityRule::Beta {
                    max: parse_f64("STABILITY_BETA_MAX", default_max)?,
                }
            }
            Some("positive_fcf") => StabilityRule::PositiveFreeCashFlow,
            Some(other) => bail!("STABILITY_RULE must be 'beta' or 'positive_fcf', got '{other}'"),
        };

        let intrinsic_method = match lookup("INTRINSIC_METHOD").as_deref().map(str::trim) {
            None | Some("auto") => IntrinsicMethod::Auto,
            Some("earnings_growth") => IntrinsicMethod::EarningsGrowth,
            Some("discounted_cash_flow") => IntrinsicMethod::DiscountedCashFlow,
            Some(other) => bail!(
                "INTRINSIC_METHOD must be auto, earnings_growth or discounted_cash_flow, got '{other}'"
            ),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            allowed_origins,
            valuation: ValuationConfig {
                moat_roe_threshold: parse_f64("MOAT_ROE_THRESHOLD", base.moat_roe_threshold)?,
                moat_beta_threshold: parse_f64("MOAT_BETA_THRESHOLD", base.moat_beta_threshold)?,
                stability_rule,
                intrinsic_method,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
