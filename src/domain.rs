//! Data shapes shared across pipeline stages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bounded slice of the raw text surrounding one identifier occurrence.
///
/// Offsets are byte offsets into the full document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub identifier: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Absolute offset of the identifier match itself
    pub identifier_offset: usize,
    pub text: String,
}

impl ContextWindow {
    /// Offset of the identifier relative to the window text
    pub fn local_identifier_offset(&self) -> usize {
        self.identifier_offset - self.start_offset
    }

    /// Byte range (window-relative) of the line holding the identifier
    pub fn identifier_line_span(&self) -> (usize, usize) {
        let pos = self.local_identifier_offset();
        let start = self.text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = self.text[pos..]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(self.text.len());
        (start, end)
    }
}

/// Which extraction strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    SameLine,
    NextLines,
    LabeledPattern,
    Aggressive,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::SameLine => "same_line",
            ExtractionMethod::NextLines => "next_lines",
            ExtractionMethod::LabeledPattern => "labeled_pattern",
            ExtractionMethod::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contextual cues observed around a candidate number, consumed by the scorer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFeatures {
    /// A value-indicating label ("market value", "amount", ...) is nearby
    pub value_label_nearby: bool,
    /// An allow-listed currency token is nearby
    pub currency_nearby: bool,
    /// An exclusionary label sits on the same line, outside the hard-reject radius
    pub exclusion_nearby: bool,
    /// Fewer than four integer digits
    pub short_digit_run: bool,
    /// Long ungrouped digit run shaped like a reference number
    pub reference_like: bool,
    /// Another identifier lies between this number and the record's identifier
    pub crosses_identifier: bool,
}

/// A provisionally extracted value for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: Decimal,
    pub confidence: f64,
    pub method: ExtractionMethod,
    pub source_identifier: String,
    /// Absolute byte offset of the number in the document
    pub offset: usize,
    pub features: CandidateFeatures,
}

/// One extracted holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRecord {
    pub identifier: String,
    pub name: String,
    pub value: Decimal,
    pub currency: String,
    /// The currency was not found in the text and the configured default was used
    pub currency_inferred: bool,
    pub category: String,
    pub confidence: f64,
    pub method: ExtractionMethod,
    pub correction_applied: bool,
    pub correction_reason: Option<String>,
    /// Duplicate occurrences disagreed on the value (flag_conflict policy)
    pub conflict: bool,
}

/// How repeated identifiers are merged during assembly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    KeepHighestConfidence,
    SumDuplicates,
    FlagConflict,
}

/// Outcome recorded for a located identifier or a merge step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Identifier located but no value candidate survived the strategies
    NoCandidate,
    Accepted,
    Corrected,
    Rejected,
    /// Duplicate occurrence folded into another record
    Merged,
    /// Duplicate occurrence disagreed with the retained record
    Conflict,
}

/// One entry of the decision trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub identifier: String,
    pub decision: Decision,
    pub original_value: Option<Decimal>,
    pub final_value: Option<Decimal>,
    pub reason: Option<String>,
}

impl DecisionEntry {
    pub fn new(identifier: &str, decision: Decision) -> Self {
        Self {
            identifier: identifier.to_string(),
            decision,
            original_value: None,
            final_value: None,
            reason: None,
        }
    }

    pub fn with_values(mut self, original: Option<Decimal>, final_value: Option<Decimal>) -> Self {
        self.original_value = original;
        self.final_value = final_value;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Table-driven quality grade of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Aggregate comparison of the extracted total against the expected total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub extracted_total: Decimal,
    pub expected_total: Option<Decimal>,
    /// `None` when no expected total is known
    pub accuracy: Option<f64>,
    pub difference: Option<Decimal>,
    pub mismatch: bool,
    pub valid_record_count: usize,
    pub total_record_count: usize,
    pub conflict_count: usize,
    pub identifier_validity_ratio: f64,
    pub currency_detection_ratio: f64,
    pub grade: QualityGrade,
}

/// Full output of one extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// SHA-256 of the raw text
    pub fingerprint: String,
    pub records: Vec<SecurityRecord>,
    pub reconciliation: ReconciliationResult,
    pub decisions: Vec<DecisionEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_line_span_finds_enclosing_line() {
        let text = "header line\nACME CORP XS1234567890 100'000\nnext line";
        let offset = text.find("XS").unwrap();
        let window = ContextWindow {
            identifier: "XS1234567890".to_string(),
            start_offset: 0,
            end_offset: text.len(),
            identifier_offset: offset,
            text: text.to_string(),
        };

        let (start, end) = window.identifier_line_span();
        assert_eq!(&window.text[start..end], "ACME CORP XS1234567890 100'000");
    }

    #[test]
    fn test_duplicate_policy_deserializes_snake_case() {
        let policy: DuplicatePolicy = serde_json::from_str("\"sum_duplicates\"").unwrap();
        assert_eq!(policy, DuplicatePolicy::SumDuplicates);
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::KeepHighestConfidence);
    }
}
