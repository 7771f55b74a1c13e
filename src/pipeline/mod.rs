//! Extraction pipeline: locate → generate → select → assemble → correct → dedupe → reconcile.
//!
//! One [`ExtractionPipeline`] is built per configuration and can be shared
//! across threads; each `extract` call is an independent, deterministic run.

pub mod processing;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, info, info_span};

use crate::config::EngineConfig;
use crate::domain::{Decision, DecisionEntry, ExtractionReport};
use crate::error::{ExtractorError, Result};
use crate::idempotency::fingerprint;
use crate::observability::metrics;
use processing::reconcile::detect_expected_total;
use processing::{
    CandidateGenerator, CandidateSelector, CorrectionLayer, Deduplicator, IdentifierLocator, RecordBuilder,
    Reconciler, RuleSet,
};

pub struct ExtractionPipeline {
    config: Arc<EngineConfig>,
    locator: IdentifierLocator,
    generator: CandidateGenerator,
    selector: CandidateSelector,
    builder: RecordBuilder,
    corrector: CorrectionLayer,
    deduplicator: Deduplicator,
    reconciler: Reconciler,
}

impl ExtractionPipeline {
    /// Build a pipeline from a validated configuration and a rule set
    pub fn new(config: EngineConfig, rules: RuleSet) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, rules))
    }

    fn assemble(config: EngineConfig, rules: RuleSet) -> Self {
        Self {
            locator: IdentifierLocator::new(config.context_radius),
            generator: CandidateGenerator::new(&config),
            selector: CandidateSelector::new(config.tie_epsilon),
            builder: RecordBuilder::new(&config),
            corrector: CorrectionLayer::new(&config, rules),
            deduplicator: Deduplicator::new(config.duplicate_policy),
            reconciler: Reconciler::new(config.mismatch_tolerance),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        self.corrector.rules()
    }

    pub fn generator_mut(&mut self) -> &mut CandidateGenerator {
        &mut self.generator
    }

    /// Run the full pipeline over one document's text. Never fails: malformed
    /// or ambiguous records are dropped or flagged in the decision trail.
    pub fn extract(&self, text: &str, expected_total: Option<Decimal>) -> ExtractionReport {
        let started = Instant::now();
        let fingerprint = fingerprint(text);
        let short = &fingerprint[..12];
        let span = info_span!("extraction", fingerprint = %short);
        let _enter = span.enter();

        let windows = self.locator.locate(text);
        let located: BTreeSet<&str> = windows.iter().map(|w| w.identifier.as_str()).collect();
        metrics::locator::located(windows.len());

        let mut decisions = Vec::with_capacity(windows.len());
        let mut records = Vec::new();
        for window in &windows {
            let candidates = self.generator.generate(window);
            let Some(chosen) = self.selector.select(candidates) else {
                debug!("No candidate for identifier={}", window.identifier);
                metrics::selection::no_candidate();
                decisions.push(
                    DecisionEntry::new(&window.identifier, Decision::NoCandidate)
                        .with_reason("no value candidate near the identifier"),
                );
                continue;
            };
            metrics::selection::selected(chosen.method, chosen.confidence);

            let record = self.builder.build(window, chosen);
            let outcome = self.corrector.validate(record);
            decisions.push(outcome.entry);
            records.extend(outcome.record);
        }

        let (records, merges) = self.deduplicator.dedupe(records);
        decisions.extend(merges);

        let expected_total = expected_total.or_else(|| {
            if self.config.detect_expected_total {
                detect_expected_total(text)
            } else {
                None
            }
        });
        let reconciliation = self.reconciler.reconcile(&records, expected_total, located.len());

        metrics::pipeline::run_completed(started.elapsed().as_secs_f64(), records.len());
        info!(
            "Extraction finished: {} occurrences, {} identifiers, {} records, grade {:?}",
            windows.len(),
            located.len(),
            records.len(),
            reconciliation.grade
        );

        ExtractionReport {
            fingerprint,
            records,
            reconciliation,
            decisions,
        }
    }

    /// Byte-level entry point: the input must be UTF-8 text without NUL bytes
    pub fn extract_bytes(&self, bytes: &[u8], expected_total: Option<Decimal>) -> Result<ExtractionReport> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractorError::InvalidInput(format!("invalid UTF-8 at byte {}", e.valid_up_to())))?;
        if let Some(pos) = text.find('\0') {
            return Err(ExtractorError::InvalidInput(format!("NUL byte at offset {}", pos)));
        }
        Ok(self.extract(text, expected_total))
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::assemble(EngineConfig::default(), RuleSet::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_pipeline_is_shareable_across_threads() {
        assert_send_sync::<ExtractionPipeline>();
    }

    #[test]
    fn test_located_identifier_without_value_is_counted_but_not_kept() {
        let report = ExtractionPipeline::default().extract("XS1234567890 see attached", None);
        assert!(report.records.is_empty());
        assert_eq!(report.reconciliation.total_record_count, 1);
        assert_eq!(report.reconciliation.valid_record_count, 0);
        assert_eq!(report.decisions.len(), 1);
        assert_eq!(report.decisions[0].decision, Decision::NoCandidate);
    }

    #[test]
    fn test_empty_text_yields_empty_report() {
        let report = ExtractionPipeline::default().extract("", None);
        assert!(report.records.is_empty());
        assert!(report.decisions.is_empty());
        assert_eq!(report.reconciliation.extracted_total, Decimal::ZERO);
        assert_eq!(report.reconciliation.accuracy, None);
    }

    #[test]
    fn test_extract_bytes_rejects_non_text() {
        let pipeline = ExtractionPipeline::default();
        assert!(matches!(
            pipeline.extract_bytes(&[0xff, 0xfe, 0x00], None),
            Err(ExtractorError::InvalidInput(_))
        ));
        assert!(matches!(
            pipeline.extract_bytes(b"XS1234567890\0 10'000", None),
            Err(ExtractorError::InvalidInput(_))
        ));
        assert!(pipeline.extract_bytes(b"XS1234567890 10'000", None).is_ok());
    }

    fn value_of(report: &ExtractionReport, identifier: &str) -> Option<Decimal> {
        report
            .records
            .iter()
            .find(|r| r.identifier == identifier)
            .map(|r| r.value)
    }

    #[test]
    fn test_detected_total_feeds_reconciliation() {
        let text = "ACME NOTES XS1234567890 USD 100'000\nTotal assets USD 400'000\n";
        let report = ExtractionPipeline::default().extract(text, None);
        assert_eq!(value_of(&report, "XS1234567890"), Some(Decimal::from(100_000)));
        assert_eq!(report.reconciliation.expected_total, Some(Decimal::from(400_000)));
        assert_eq!(report.reconciliation.accuracy, Some(0.25));
    }

    #[test]
    fn test_total_line_is_not_the_last_holding() {
        let text = "ALPHA NOTES XS1234567890 USD 100'000\n\
                    BETA SHARES US0378331005 USD 200'000\n\
                    Total assets USD 300'000\n";
        let report = ExtractionPipeline::default().extract(text, None);
        assert_eq!(value_of(&report, "XS1234567890"), Some(Decimal::from(100_000)));
        assert_eq!(value_of(&report, "US0378331005"), Some(Decimal::from(200_000)));
        assert_eq!(report.reconciliation.expected_total, Some(Decimal::from(300_000)));
        assert_eq!(report.reconciliation.accuracy, Some(1.0));
    }

    #[test]
    fn test_ascending_holdings_keep_their_own_values() {
        let text = "ALPHA NOTES XS1234567890 USD 100'000\n\
                    BETA SHARES US0378331005 USD 200'000\n\
                    GAMMA BONDS CH0012032048 USD 300'000\n";
        let report = ExtractionPipeline::default().extract(text, None);
        assert_eq!(report.records.len(), 3);
        assert_eq!(value_of(&report, "XS1234567890"), Some(Decimal::from(100_000)));
        assert_eq!(value_of(&report, "US0378331005"), Some(Decimal::from(200_000)));
        assert_eq!(value_of(&report, "CH0012032048"), Some(Decimal::from(300_000)));
    }

    #[test]
    fn test_negative_values_are_never_extracted() {
        for text in [
            "ACME NOTES XS1234567890 USD -50'000",
            "ACME NOTES XS1234567890 USD (50'000)",
        ] {
            let report = ExtractionPipeline::default().extract(text, None);
            assert!(report.records.is_empty(), "{}", text);
            assert_eq!(report.decisions[0].decision, Decision::NoCandidate);
        }
    }

    #[test]
    fn test_small_radius_keeps_numbers_whole() {
        let config = EngineConfig {
            context_radius: 20,
            ..EngineConfig::default()
        };
        let pipeline = ExtractionPipeline::new(config, RuleSet::empty()).unwrap();
        let report = pipeline.extract("ACME NOTES XS1234567890 Market value USD 1'234'567", None);
        assert_eq!(value_of(&report, "XS1234567890"), Some(Decimal::from(1_234_567)));
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = EngineConfig {
            context_radius: 0,
            ..EngineConfig::default()
        };
        assert!(ExtractionPipeline::new(config, RuleSet::empty()).is_err());
    }
}
