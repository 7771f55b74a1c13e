//! Metrics for the extraction engine
//!
//! Every event has one recording function, grouped by pipeline stage. Calls are
//! no-ops until a recorder is installed; only the binary installs one.

use std::fmt;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::domain::{Decision, ExtractionMethod, QualityGrade};

/// Enum representing all metric names used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Locator
    LocatorIdentifiersLocated,

    // Candidates
    CandidatesGenerated,

    // Selection
    SelectionSelected,
    SelectionConfidence,
    SelectionNoCandidate,

    // Correction
    CorrectionAccepted,
    CorrectionCorrected,
    CorrectionRejected,

    // Assembly
    AssemblyDuplicatesMerged,
    AssemblyConflicts,

    // Reconciliation
    ReconcileAccuracy,
    ReconcileGrade,
    ReconcileMismatch,

    // Pipeline
    PipelineRuns,
    PipelineDuration,
    PipelineRecords,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::LocatorIdentifiersLocated => "holdings_locator_identifiers_located_total",

            MetricName::CandidatesGenerated => "holdings_candidates_generated_total",

            MetricName::SelectionSelected => "holdings_selection_selected_total",
            MetricName::SelectionConfidence => "holdings_selection_confidence",
            MetricName::SelectionNoCandidate => "holdings_selection_no_candidate_total",

            MetricName::CorrectionAccepted => "holdings_correction_accepted_total",
            MetricName::CorrectionCorrected => "holdings_correction_corrected_total",
            MetricName::CorrectionRejected => "holdings_correction_rejected_total",

            MetricName::AssemblyDuplicatesMerged => "holdings_assembly_duplicates_merged_total",
            MetricName::AssemblyConflicts => "holdings_assembly_conflicts_total",

            MetricName::ReconcileAccuracy => "holdings_reconcile_accuracy",
            MetricName::ReconcileGrade => "holdings_reconcile_grade_total",
            MetricName::ReconcileMismatch => "holdings_reconcile_mismatch_total",

            MetricName::PipelineRuns => "holdings_pipeline_runs_total",
            MetricName::PipelineDuration => "holdings_pipeline_duration_seconds",
            MetricName::PipelineRecords => "holdings_pipeline_records",
        }
    }

    /// All metric names, in declaration order
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            LocatorIdentifiersLocated,
            CandidatesGenerated,
            SelectionSelected,
            SelectionConfidence,
            SelectionNoCandidate,
            CorrectionAccepted,
            CorrectionCorrected,
            CorrectionRejected,
            AssemblyDuplicatesMerged,
            AssemblyConflicts,
            ReconcileAccuracy,
            ReconcileGrade,
            ReconcileMismatch,
            PipelineRuns,
            PipelineDuration,
            PipelineRecords,
        ]
        .into_iter()
    }
}

/// Install the Prometheus recorder and return the handle used to render it
pub fn init() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    info!("Metrics recorder installed");
    Ok(handle)
}

// ============================================================================
// Locator
// ============================================================================

pub mod locator {
    use super::MetricName;

    pub fn located(occurrences: usize) {
        ::metrics::counter!(MetricName::LocatorIdentifiersLocated.as_str()).increment(occurrences as u64);
    }
}

// ============================================================================
// Candidates
// ============================================================================

pub mod candidates {
    use super::{ExtractionMethod, MetricName};

    /// Candidates produced by one strategy for one window
    pub fn generated(method: ExtractionMethod, count: usize) {
        ::metrics::counter!(MetricName::CandidatesGenerated.as_str(), "method" => method.as_str())
            .increment(count as u64);
    }
}

// ============================================================================
// Selection
// ============================================================================

pub mod selection {
    use super::{ExtractionMethod, MetricName};

    pub fn selected(method: ExtractionMethod, confidence: f64) {
        ::metrics::counter!(MetricName::SelectionSelected.as_str(), "method" => method.as_str()).increment(1);
        ::metrics::histogram!(MetricName::SelectionConfidence.as_str()).record(confidence);
    }

    pub fn no_candidate() {
        ::metrics::counter!(MetricName::SelectionNoCandidate.as_str()).increment(1);
    }
}

// ============================================================================
// Correction
// ============================================================================

pub mod correction {
    use super::{Decision, MetricName};

    /// Count one correction-layer outcome
    pub fn decision(decision: Decision) {
        let name = match decision {
            Decision::Corrected => MetricName::CorrectionCorrected,
            Decision::Rejected => MetricName::CorrectionRejected,
            _ => MetricName::CorrectionAccepted,
        };
        ::metrics::counter!(name.as_str()).increment(1);
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub mod assembly {
    use super::MetricName;

    pub fn merged() {
        ::metrics::counter!(MetricName::AssemblyDuplicatesMerged.as_str()).increment(1);
    }

    pub fn conflict() {
        ::metrics::counter!(MetricName::AssemblyConflicts.as_str()).increment(1);
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

pub mod reconcile {
    use super::{MetricName, QualityGrade};

    pub fn accuracy(value: f64) {
        ::metrics::histogram!(MetricName::ReconcileAccuracy.as_str()).record(value);
    }

    pub fn graded(grade: QualityGrade) {
        let label = match grade {
            QualityGrade::Excellent => "excellent",
            QualityGrade::Good => "good",
            QualityGrade::Fair => "fair",
            QualityGrade::Poor => "poor",
        };
        ::metrics::counter!(MetricName::ReconcileGrade.as_str(), "grade" => label).increment(1);
    }

    pub fn mismatch() {
        ::metrics::counter!(MetricName::ReconcileMismatch.as_str()).increment(1);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub mod pipeline {
    use super::MetricName;

    pub fn run_completed(secs: f64, records: usize) {
        ::metrics::counter!(MetricName::PipelineRuns.as_str()).increment(1);
        ::metrics::histogram!(MetricName::PipelineDuration.as_str()).record(secs);
        ::metrics::histogram!(MetricName::PipelineRecords.as_str()).record(records as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("holdings_")));
    }

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        candidates::generated(ExtractionMethod::SameLine, 3);
        correction::decision(Decision::Rejected);
        reconcile::graded(QualityGrade::Good);
    }
}
