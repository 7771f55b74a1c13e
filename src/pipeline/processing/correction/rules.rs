use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ExtractorError, Result};

/// What a matching rule does to a record's value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectionAction {
    /// Replace the value outright
    FixedValue { value: Decimal },
    /// Multiply the value
    ScaleFactor { factor: Decimal },
    /// Clamp the value into `[min, max]`
    RangeClamp { min: Decimal, max: Decimal },
}

/// A configured override, matched by exact identifier or by name substring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    pub action: CorrectionAction,
    pub reason: String,
}

impl CorrectionRule {
    pub fn for_identifier(identifier: &str, action: CorrectionAction, reason: &str) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            name_contains: None,
            action,
            reason: reason.to_string(),
        }
    }

    pub fn for_name(fragment: &str, action: CorrectionAction, reason: &str) -> Self {
        Self {
            identifier: None,
            name_contains: Some(fragment.to_string()),
            action,
            reason: reason.to_string(),
        }
    }

    /// Identifier matches exactly; name matches as a case-insensitive substring
    pub fn matches(&self, identifier: &str, name: &str) -> bool {
        if let Some(ref id) = self.identifier {
            return id == identifier;
        }
        if let Some(ref fragment) = self.name_contains {
            return name.to_lowercase().contains(&fragment.to_lowercase());
        }
        false
    }

    /// Apply the action; returns the new value
    pub fn apply(&self, value: Decimal) -> Decimal {
        match &self.action {
            CorrectionAction::FixedValue { value: fixed } => *fixed,
            CorrectionAction::ScaleFactor { factor } => value * *factor,
            CorrectionAction::RangeClamp { min, max } => value.clamp(*min, *max),
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let target_count = self.identifier.is_some() as u8 + self.name_contains.is_some() as u8;
        if target_count != 1 {
            return Err(ExtractorError::Config(format!(
                "rule #{} must set exactly one of `identifier` or `name_contains`",
                index
            )));
        }
        if self.name_contains.as_deref().map_or(false, |f| f.trim().is_empty()) {
            return Err(ExtractorError::Config(format!("rule #{} has an empty name_contains", index)));
        }
        if self.reason.trim().is_empty() {
            return Err(ExtractorError::Config(format!("rule #{} needs a non-empty reason", index)));
        }
        match &self.action {
            CorrectionAction::FixedValue { value } if value.is_sign_negative() => Err(ExtractorError::Config(
                format!("rule #{} fixes a negative value", index),
            )),
            CorrectionAction::ScaleFactor { factor } if *factor <= Decimal::ZERO => Err(
                ExtractorError::Config(format!("rule #{} has a non-positive scale factor", index)),
            ),
            CorrectionAction::RangeClamp { min, max } if min > max => Err(ExtractorError::Config(format!(
                "rule #{} clamps to an inverted range",
                index
            ))),
            CorrectionAction::RangeClamp { min, .. } if min.is_sign_negative() => Err(ExtractorError::Config(
                format!("rule #{} clamps to a range below zero", index),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CorrectionRule>,
}

/// Immutable, shareable list of correction rules, matched in file order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Arc<[CorrectionRule]>,
}

impl RuleSet {
    pub fn new(rules: Vec<CorrectionRule>) -> Result<Self> {
        for (index, rule) in rules.iter().enumerate() {
            rule.validate(index)?;
        }
        Ok(Self { rules: rules.into() })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a `[[rules]]` TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!("Failed to read rules file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(content)?;
        Self::new(file.rules)
    }

    /// First rule matching the identifier or name
    pub fn first_match(&self, identifier: &str, name: &str) -> Option<&CorrectionRule> {
        self.rules.iter().find(|rule| rule.matches(identifier, name))
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
