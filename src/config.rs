// Engine configuration
// Plain structs with defaults; optionally loaded from a JSON file where any
// missing field falls back to its default.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::search_params::{BudgetTier, TripKind};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Provider registered more than once: {0}")]
    DuplicateProvider(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub provider_timeout_ms: u64,
    pub request_timeout_ms: Option<u64>,
    pub max_concurrent_providers: Option<usize>,
    pub currency: CurrencyConfig,
    pub budget_bands: BudgetBands,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 3000,
            request_timeout_ms: None,
            max_concurrent_providers: None,
            currency: CurrencyConfig::default(),
            budget_bands: BudgetBands::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "provider_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_providers == Some(0) {
            return Err(ConfigError::Invalid(
                "max_concurrent_providers must be greater than zero".to_string(),
            ));
        }
        self.currency.validate()?;
        self.budget_bands.validate()
    }
}

// Display currency plus conversion rates into it
// A rate is how many display units one unit of the source currency buys.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CurrencyConfig {
    pub display: String,
    pub rates: BTreeMap<String, f64>,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        let rates = [
            ("EUR", 1.08),
            ("GBP", 1.27),
            ("CAD", 0.73),
            ("JPY", 0.0067),
        ]
        .into_iter()
        .map(|(code, rate)| (code.to_string(), rate))
        .collect();

        Self {
            display: "USD".to_string(),
            rates,
        }
    }
}

impl CurrencyConfig {
    pub fn rate_for(&self, currency: &str) -> Option<f64> {
        if currency.eq_ignore_ascii_case(&self.display) {
            return Some(1.0);
        }
        self.rates
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(currency))
            .map(|(_, rate)| *rate)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.display.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "display currency must not be empty".to_string(),
            ));
        }
        if let Some((code, rate)) = self
            .rates
            .iter()
            .find(|(_, rate)| !rate.is_finite() || **rate <= 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "exchange rate for {} must be positive, got {}",
                code, rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceBand {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceBand {
    pub const UNBOUNDED: PriceBand = PriceBand {
        min: None,
        max: None,
    };

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierBands {
    pub budget: PriceBand,
    pub standard: PriceBand,
    pub premium: PriceBand,
}

impl TierBands {
    // Per ticket
    pub fn flight() -> Self {
        Self {
            budget: PriceBand::at_most(500.0),
            standard: PriceBand::at_most(900.0),
            premium: PriceBand::at_least(500.0),
        }
    }

    // Per night
    pub fn hotel() -> Self {
        Self {
            budget: PriceBand::at_most(150.0),
            standard: PriceBand::at_most(250.0),
            premium: PriceBand::at_least(150.0),
        }
    }
}

// Tiers present in a config file; absent tiers keep the trip kind's bands
#[derive(Debug, Deserialize)]
struct TierOverrides {
    budget: Option<PriceBand>,
    standard: Option<PriceBand>,
    premium: Option<PriceBand>,
}

impl TierOverrides {
    fn apply(self, base: TierBands) -> TierBands {
        TierBands {
            budget: self.budget.unwrap_or(base.budget),
            standard: self.standard.unwrap_or(base.standard),
            premium: self.premium.unwrap_or(base.premium),
        }
    }
}

fn flight_bands<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TierBands, D::Error> {
    TierOverrides::deserialize(deserializer).map(|o| o.apply(TierBands::flight()))
}

fn hotel_bands<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TierBands, D::Error> {
    TierOverrides::deserialize(deserializer).map(|o| o.apply(TierBands::hotel()))
}

// Price bands each budget tier admits, per trip kind, in display currency
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BudgetBands {
    #[serde(deserialize_with = "flight_bands")]
    pub flight: TierBands,
    #[serde(deserialize_with = "hotel_bands")]
    pub hotel: TierBands,
}

impl Default for BudgetBands {
    fn default() -> Self {
        Self {
            flight: TierBands::flight(),
            hotel: TierBands::hotel(),
        }
    }
}

impl BudgetBands {
    pub fn band_for(&self, kind: TripKind, tier: BudgetTier) -> PriceBand {
        let bands = match kind {
            TripKind::Flight => &self.flight,
            TripKind::Hotel => &self.hotel,
        };
        match tier {
            BudgetTier::Budget => bands.budget,
            BudgetTier::Standard => bands.standard,
            BudgetTier::Premium => bands.premium,
            BudgetTier::Any => PriceBand::UNBOUNDED,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            ("flight.budget", self.flight.budget),
            ("flight.standard", self.flight.standard),
            ("flight.premium", self.flight.premium),
            ("hotel.budget", self.hotel.budget),
            ("hotel.standard", self.hotel.standard),
            ("hotel.premium", self.hotel.premium),
        ];
        for (name, band) in all {
            if let (Some(min), Some(max)) = (band.min, band.max) {
                if min > max {
                    return Err(ConfigError::Invalid(format!(
                        "budget band {} has min {} above max {}",
                        name, min, max
                    )));
                }
            }
        }
        Ok(())
    }
}
