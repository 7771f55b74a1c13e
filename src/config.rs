use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::{
    DEFAULT_CURRENCIES, DEFAULT_CURRENCY, DEFAULT_EXCLUSION_LABELS, DEFAULT_SCALE_DIVISOR,
    DEFAULT_VALUE_LABELS,
};
use crate::domain::DuplicatePolicy;
use crate::error::{ExtractorError, Result};

/// Tunables for one extraction engine. Every field has a default, so a TOML
/// file only needs to name what it overrides.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Characters taken on each side of an identifier match
    pub context_radius: usize,
    /// Lines scanned after the identifier's line by the next_lines strategy
    pub next_lines_count: usize,
    pub value_range_min: Decimal,
    pub value_range_max: Decimal,
    /// Values above this are assumed to be grouping-separator misparses
    pub implausible_ceiling: Decimal,
    pub scale_divisor: Decimal,
    /// Range accepted by the aggressive fallback strategy
    pub aggressive_min: Decimal,
    pub aggressive_max: Decimal,
    /// Confidence difference below which candidates count as tied
    pub tie_epsilon: f64,
    /// Tokens before a number inspected for exclusionary labels
    pub exclusion_token_radius: usize,
    /// Tokens after a number inspected for exclusionary labels
    pub exclusion_token_radius_after: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub currencies: Vec<String>,
    pub default_currency: String,
    pub value_labels: Vec<String>,
    pub exclusion_labels: Vec<String>,
    /// Read a labelled portfolio total from the text when none is supplied
    pub detect_expected_total: bool,
    /// Drop records whose identifier fails the ISIN check digit
    pub reject_invalid_checksum: bool,
    /// Accuracy shortfall tolerated before a run is flagged as a mismatch
    pub mismatch_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_radius: 500,
            next_lines_count: 3,
            value_range_min: Decimal::from(1_000),
            value_range_max: Decimal::from(500_000_000),
            implausible_ceiling: Decimal::from(1_000_000_000),
            scale_divisor: Decimal::from(DEFAULT_SCALE_DIVISOR),
            aggressive_min: Decimal::from(100),
            aggressive_max: Decimal::from(100_000_000_000i64),
            tie_epsilon: 0.05,
            exclusion_token_radius: 1,
            exclusion_token_radius_after: 1,
            duplicate_policy: DuplicatePolicy::default(),
            currencies: DEFAULT_CURRENCIES.iter().map(|s| s.to_string()).collect(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            value_labels: DEFAULT_VALUE_LABELS.iter().map(|s| s.to_string()).collect(),
            exclusion_labels: DEFAULT_EXCLUSION_LABELS.iter().map(|s| s.to_string()).collect(),
            detect_expected_total: true,
            reject_invalid_checksum: false,
            mismatch_tolerance: 0.01,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: EngineConfig = toml::from_str(content)?;
        config.currencies = config.currencies.iter().map(|c| c.trim().to_uppercase()).collect();
        config.default_currency = config.default_currency.trim().to_uppercase();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.context_radius == 0 {
            return Err(ExtractorError::Config("context_radius must be positive".to_string()));
        }
        if self.value_range_min > self.value_range_max {
            return Err(ExtractorError::Config(format!(
                "value_range_min {} exceeds value_range_max {}",
                self.value_range_min, self.value_range_max
            )));
        }
        if self.aggressive_min > self.aggressive_max {
            return Err(ExtractorError::Config(format!(
                "aggressive_min {} exceeds aggressive_max {}",
                self.aggressive_min, self.aggressive_max
            )));
        }
        if self.scale_divisor <= Decimal::ONE {
            return Err(ExtractorError::Config("scale_divisor must be greater than 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.tie_epsilon) {
            return Err(ExtractorError::Config("tie_epsilon must lie in [0, 1]".to_string()));
        }
        if !(0.0..=1.0).contains(&self.mismatch_tolerance) {
            return Err(ExtractorError::Config("mismatch_tolerance must lie in [0, 1]".to_string()));
        }
        if self.currencies.is_empty() {
            return Err(ExtractorError::Config("currency allow-list is empty".to_string()));
        }
        if !self.currencies.contains(&self.default_currency) {
            return Err(ExtractorError::Config(format!(
                "default_currency {} is not in the currency allow-list",
                self.default_currency
            )));
        }
        Ok(())
    }

    pub fn is_allowed_currency(&self, code: &str) -> bool {
        self.currencies.iter().any(|c| c.eq_ignore_ascii_case(code))
    }
}
