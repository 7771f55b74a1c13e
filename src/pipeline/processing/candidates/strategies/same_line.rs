use tracing::debug;

use crate::domain::{Candidate, ContextWindow, ExtractionMethod};
use crate::pipeline::processing::candidates::{candidate_from_token, record_span, ExtractionStrategy, ScanContext};

/// Numbers on the same text line as the identifier
pub struct SameLineStrategy;

impl SameLineStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionStrategy for SameLineStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::SameLine
    }

    fn name(&self) -> &str {
        "Same-line scan"
    }

    fn extract(&self, window: &ContextWindow, ctx: &ScanContext) -> Vec<Candidate> {
        let (line_start, line_end) = window.identifier_line_span();
        let (span_start, span_end) = record_span(window);
        let candidates: Vec<Candidate> = ctx
            .scan_numbers(&window.text, line_start.max(span_start), line_end.min(span_end))
            .iter()
            .filter(|token| ctx.admissible(&window.text, token))
            .map(|token| candidate_from_token(window, ctx, token, self.method()))
            .collect();

        debug!(
            "SameLineStrategy: identifier={} candidates={}",
            window.identifier,
            candidates.len()
        );
        candidates
    }
}

impl Default for SameLineStrategy {
    fn default() -> Self {
        Self::new()
    }
}
