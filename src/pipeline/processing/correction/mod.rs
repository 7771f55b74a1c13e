//! Correction and validation of assembled records.
//!
//! Order of operations per record:
//! 1. the first matching correction rule, which is authoritative and skips the
//!    range filter but not the sign check;
//! 2. otherwise the order-of-magnitude heuristic: a value above the implausible
//!    ceiling is assumed to be a grouping-separator misparse and divided once
//!    by `scale_divisor`;
//! 3. the plausibility range filter, which rejects rather than corrects;
//! 4. optionally, the ISIN check digit.
//!
//! Every record yields exactly one [`DecisionEntry`].

pub mod rules;

pub use rules::{CorrectionAction, CorrectionRule, RuleSet};

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::domain::{Decision, DecisionEntry, SecurityRecord};
use crate::observability::metrics;
use crate::pipeline::processing::locator::isin_checksum_valid;

/// Result of validating one record
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// `None` when the record was rejected
    pub record: Option<SecurityRecord>,
    pub entry: DecisionEntry,
}

/// Applies correction rules and plausibility checks
#[derive(Debug, Clone)]
pub struct CorrectionLayer {
    rules: RuleSet,
    range_min: Decimal,
    range_max: Decimal,
    implausible_ceiling: Decimal,
    scale_divisor: Decimal,
    reject_invalid_checksum: bool,
}

impl CorrectionLayer {
    pub fn new(config: &EngineConfig, rules: RuleSet) -> Self {
        Self {
            rules,
            range_min: config.value_range_min,
            range_max: config.value_range_max,
            implausible_ceiling: config.implausible_ceiling,
            scale_divisor: config.scale_divisor,
            reject_invalid_checksum: config.reject_invalid_checksum,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn validate(&self, mut record: SecurityRecord) -> ValidationOutcome {
        let original = record.value;

        if self.reject_invalid_checksum && !isin_checksum_valid(&record.identifier) {
            return self.reject(record, original, "identifier fails the ISIN check digit".to_string());
        }

        if let Some(rule) = self.rules.first_match(&record.identifier, &record.name) {
            record.value = rule.apply(record.value);
            if record.value.is_sign_negative() {
                let reason = format!("negative value {} after rule: {}", record.value, rule.reason);
                return self.reject(record, original, reason);
            }
            if record.value != original {
                record.correction_applied = true;
                record.correction_reason = Some(rule.reason.clone());
            }
            let decision = if record.correction_applied {
                Decision::Corrected
            } else {
                Decision::Accepted
            };
            debug!(
                "CorrectionLayer: identifier={} rule matched original={} final={}",
                record.identifier, original, record.value
            );
            return self.keep(record, original, decision, Some(rule.reason.clone()));
        }

        if record.value > self.implausible_ceiling {
            let corrected = record.value / self.scale_divisor;
            let reason = format!(
                "scale correction: {} exceeds the implausible ceiling {}; divided by {} assuming a grouping-separator misparse",
                original, self.implausible_ceiling, self.scale_divisor
            );
            debug!("CorrectionLayer: identifier={} {}", record.identifier, reason);
            record.value = corrected.normalize();
            record.correction_applied = true;
            record.correction_reason = Some(reason);
        }

        if record.value.is_sign_negative() || record.value < self.range_min || record.value > self.range_max {
            let reason = format!(
                "out of range: {} outside [{}, {}]",
                record.value, self.range_min, self.range_max
            );
            return self.reject(record, original, reason);
        }

        let decision = if record.correction_applied {
            Decision::Corrected
        } else {
            Decision::Accepted
        };
        let reason = record.correction_reason.clone();
        self.keep(record, original, decision, reason)
    }

    fn keep(
        &self,
        record: SecurityRecord,
        original: Decimal,
        decision: Decision,
        reason: Option<String>,
    ) -> ValidationOutcome {
        metrics::correction::decision(decision);
        let mut entry =
            DecisionEntry::new(&record.identifier, decision).with_values(Some(original), Some(record.value));
        entry.reason = reason;
        ValidationOutcome {
            record: Some(record),
            entry,
        }
    }

    fn reject(&self, record: SecurityRecord, original: Decimal, reason: String) -> ValidationOutcome {
        warn!("CorrectionLayer: rejecting identifier={} {}", record.identifier, reason);
        metrics::correction::decision(Decision::Rejected);
        ValidationOutcome {
            record: None,
            entry: DecisionEntry::new(&record.identifier, Decision::Rejected)
                .with_values(Some(original), None)
                .with_reason(reason),
        }
    }
}
