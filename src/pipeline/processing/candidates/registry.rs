use tracing::debug;

use super::strategies::{AggressiveStrategy, LabeledPatternStrategy, NextLinesStrategy, SameLineStrategy};
use super::{ExtractionStrategy, ScanContext};
use crate::config::EngineConfig;
use crate::domain::{Candidate, ContextWindow};
use crate::observability::metrics;

/// Ordered registry of extraction strategies.
///
/// Registration order is the order candidates are emitted in, which keeps
/// downstream tie-breaks deterministic.
pub struct CandidateGenerator {
    ctx: ScanContext,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl CandidateGenerator {
    /// Create a generator with the built-in strategies
    pub fn new(config: &EngineConfig) -> Self {
        let ctx = ScanContext::from_config(config);
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(SameLineStrategy::new()),
            Box::new(NextLinesStrategy::new()),
            Box::new(LabeledPatternStrategy::new(&ctx)),
            Box::new(AggressiveStrategy::new()),
        ];
        Self { ctx, strategies }
    }

    /// Append a custom strategy after the built-in ones
    pub fn register(&mut self, strategy: Box<dyn ExtractionStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn scan_context(&self) -> &ScanContext {
        &self.ctx
    }

    /// Run every strategy over the window and concatenate their output
    pub fn generate(&self, window: &ContextWindow) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for strategy in &self.strategies {
            let produced = strategy.extract(window, &self.ctx);
            metrics::candidates::generated(strategy.method(), produced.len());
            candidates.extend(produced);
        }
        debug!(
            "CandidateGenerator: identifier={} total_candidates={}",
            window.identifier,
            candidates.len()
        );
        candidates
    }

    /// List registered strategy names in run order
    pub fn list_strategies(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExtractionMethod;
    use crate::pipeline::processing::locator::IdentifierLocator;
    use rust_decimal::Decimal;
    use std::collections::BTreeSet;

    #[test]
    fn test_registry_has_built_in_strategies_in_order() {
        let generator = CandidateGenerator::new(&EngineConfig::default());
        assert_eq!(
            generator.list_strategies(),
            vec![
                "Same-line scan",
                "Following-lines scan",
                "Labeled-pattern scan",
                "Unrestricted number scan"
            ]
        );
    }

    #[test]
    fn test_strategies_do_not_short_circuit_each_other() {
        let text = "ACME NOTES XS1234567890 Market value USD 199'080";
        let window = &IdentifierLocator::default().locate(text)[0];
        let generator = CandidateGenerator::new(&EngineConfig::default());

        let candidates = generator.generate(window);
        let methods: BTreeSet<ExtractionMethod> = candidates.iter().map(|c| c.method).collect();
        assert!(methods.contains(&ExtractionMethod::SameLine));
        assert!(methods.contains(&ExtractionMethod::LabeledPattern));
        assert!(methods.contains(&ExtractionMethod::Aggressive));
        assert!(candidates.iter().all(|c| c.value == Decimal::from(199_080)));
    }

    struct FixedStrategy;

    impl ExtractionStrategy for FixedStrategy {
        fn method(&self) -> ExtractionMethod {
            ExtractionMethod::Aggressive
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn extract(&self, window: &ContextWindow, _ctx: &ScanContext) -> Vec<Candidate> {
            vec![Candidate {
                value: Decimal::from(7),
                confidence: 0.0,
                method: self.method(),
                source_identifier: window.identifier.clone(),
                offset: window.identifier_offset,
                features: Default::default(),
            }]
        }
    }

    #[test]
    fn test_registered_strategy_runs_last() {
        let mut generator = CandidateGenerator::new(&EngineConfig::default());
        generator.register(Box::new(FixedStrategy));

        let text = "XS1234567890";
        let window = &IdentifierLocator::default().locate(text)[0];
        let candidates = generator.generate(window);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].value, Decimal::from(7));
        assert_eq!(generator.list_strategies().last(), Some(&"fixed"));
    }
}
