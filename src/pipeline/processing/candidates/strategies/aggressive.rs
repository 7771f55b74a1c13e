use tracing::debug;

use crate::domain::{Candidate, ContextWindow, ExtractionMethod};
use crate::pipeline::processing::candidates::{candidate_from_token, record_span, ExtractionStrategy, ScanContext};

/// Any admissible number in the record's part of the window within the broad fallback range.
/// Scored lowest; it only wins when nothing better exists.
pub struct AggressiveStrategy;

impl AggressiveStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionStrategy for AggressiveStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Aggressive
    }

    fn name(&self) -> &str {
        "Unrestricted number scan"
    }

    fn extract(&self, window: &ContextWindow, ctx: &ScanContext) -> Vec<Candidate> {
        let text = window.text.as_str();
        let (span_start, span_end) = record_span(window);
        let candidates: Vec<Candidate> = ctx
            .scan_numbers(text, span_start, span_end)
            .iter()
            .filter(|token| ctx.admissible(text, token))
            .filter(|token| token.literal.value >= ctx.aggressive_min && token.literal.value <= ctx.aggressive_max)
            .map(|token| candidate_from_token(window, ctx, token, self.method()))
            .collect();

        debug!(
            "AggressiveStrategy: identifier={} candidates={}",
            window.identifier,
            candidates.len()
        );
        candidates
    }
}

impl Default for AggressiveStrategy {
    fn default() -> Self {
        Self::new()
    }
}
