//! Reconciliation of the extracted total against an expected portfolio total,
//! and the table-driven quality grade of a run.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::constants::PORTFOLIO_TOTAL_LABELS;
use crate::domain::{QualityGrade, ReconciliationResult, SecurityRecord};
use crate::observability::metrics;
use crate::pipeline::processing::candidates::scan::NUMBER_PATTERN;
use crate::pipeline::processing::locator::isin_checksum_valid;
use crate::pipeline::processing::numeric::normalize;

/// Minimum (accuracy, identifier validity, currency detection) per grade, best first
const GRADE_TABLE: &[(QualityGrade, f64, f64, f64)] = &[
    (QualityGrade::Excellent, 0.99, 0.95, 0.90),
    (QualityGrade::Good, 0.95, 0.90, 0.75),
    (QualityGrade::Fair, 0.85, 0.75, 0.50),
];

static PORTFOLIO_TOTAL: Lazy<Regex> = Lazy::new(|| {
    let labels: Vec<String> = PORTFOLIO_TOTAL_LABELS
        .iter()
        .map(|l| regex::escape(l).replace(' ', r"\s+"))
        .collect();
    Regex::new(&format!(
        r"(?i)\b(?:{})\b[^\d\n]{{0,40}}?({})",
        labels.join("|"),
        NUMBER_PATTERN
    ))
    .unwrap()
});

/// Symmetric ratio `min / max`, in `[0, 1]`; two zero totals agree perfectly
pub fn accuracy(extracted: Decimal, expected: Decimal) -> f64 {
    let extracted = extracted.max(Decimal::ZERO);
    let expected = expected.max(Decimal::ZERO);
    let high = extracted.max(expected);
    if high.is_zero() {
        return 1.0;
    }
    let ratio = extracted.min(expected) / high;
    ratio.to_f64().unwrap_or(0.0).clamp(0.0, 1.0)
}

/// Grade a run; without an accuracy the best reachable grade is Good
pub fn grade(accuracy: Option<f64>, identifier_ratio: f64, currency_ratio: f64) -> QualityGrade {
    let reached = GRADE_TABLE
        .iter()
        .find(|(_, min_accuracy, min_ids, min_currency)| {
            accuracy.map_or(true, |a| a >= *min_accuracy)
                && identifier_ratio >= *min_ids
                && currency_ratio >= *min_currency
        })
        .map(|(grade, ..)| *grade)
        .unwrap_or(QualityGrade::Poor);

    if accuracy.is_none() && reached == QualityGrade::Excellent {
        QualityGrade::Good
    } else {
        reached
    }
}

/// Last portfolio-total figure printed in the text, if any
pub fn detect_expected_total(text: &str) -> Option<Decimal> {
    PORTFOLIO_TOTAL
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| normalize(m.as_str())))
        .last()
}

/// Compares retained records against the expected total
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    mismatch_tolerance: f64,
}

impl Reconciler {
    pub fn new(mismatch_tolerance: f64) -> Self {
        Self { mismatch_tolerance }
    }

    /// `located` is the number of distinct identifiers found in the text
    pub fn reconcile(
        &self,
        records: &[SecurityRecord],
        expected_total: Option<Decimal>,
        located: usize,
    ) -> ReconciliationResult {
        let extracted_total: Decimal = records.iter().map(|r| r.value).sum();
        let accuracy = expected_total.map(|expected| accuracy(extracted_total, expected));
        let difference = expected_total.map(|expected| extracted_total - expected);
        let mismatch = accuracy.map_or(false, |a| a < 1.0 - self.mismatch_tolerance);

        let identifier_validity_ratio = ratio(records, |r| isin_checksum_valid(&r.identifier));
        let currency_detection_ratio = ratio(records, |r| !r.currency_inferred);
        let conflict_count = records.iter().filter(|r| r.conflict).count();
        let grade = grade(accuracy, identifier_validity_ratio, currency_detection_ratio);

        if let Some(a) = accuracy {
            metrics::reconcile::accuracy(a);
        }
        metrics::reconcile::graded(grade);
        if mismatch {
            metrics::reconcile::mismatch();
            warn!(
                "Reconciler: extracted total {} diverges from expected {:?} (accuracy {:.4})",
                extracted_total,
                expected_total,
                accuracy.unwrap_or_default()
            );
        } else {
            info!(
                "Reconciler: extracted total {} over {} of {} records, grade {:?}",
                extracted_total,
                records.len(),
                located,
                grade
            );
        }

        ReconciliationResult {
            extracted_total,
            expected_total,
            accuracy,
            difference,
            mismatch,
            valid_record_count: records.len(),
            total_record_count: located.max(records.len()),
            conflict_count,
            identifier_validity_ratio,
            currency_detection_ratio,
            grade,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(0.01)
    }
}

fn ratio(records: &[SecurityRecord], predicate: impl Fn(&SecurityRecord) -> bool) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().filter(|r| predicate(r)).count() as f64 / records.len() as f64
}
