use tracing::debug;

use crate::domain::{Candidate, ContextWindow, ExtractionMethod};
use crate::pipeline::processing::candidates::{candidate_from_token, record_span, ExtractionStrategy, ScanContext};
use crate::pipeline::processing::locator::IDENTIFIER_PATTERN;

/// Numbers on the lines following the identifier's line.
///
/// Blank lines are skipped without counting, and the scan stops at the next
/// line carrying another identifier, since that line belongs to the next holding.
pub struct NextLinesStrategy;

impl NextLinesStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionStrategy for NextLinesStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::NextLines
    }

    fn name(&self) -> &str {
        "Following-lines scan"
    }

    fn extract(&self, window: &ContextWindow, ctx: &ScanContext) -> Vec<Candidate> {
        let text = window.text.as_str();
        let (_, line_end) = window.identifier_line_span();
        let (_, span_end) = record_span(window);
        let mut candidates = Vec::new();
        let mut lines_seen = 0usize;
        let mut cursor = line_end;

        while lines_seen < ctx.next_lines_count && cursor < text.len() {
            let start = cursor + 1;
            if start >= span_end {
                break;
            }
            let end = text[start..].find('\n').map(|i| start + i).unwrap_or(text.len()).min(span_end);
            cursor = end;

            let line = &text[start..end];
            if line.trim().is_empty() {
                continue;
            }
            if IDENTIFIER_PATTERN.is_match(line) {
                break;
            }
            lines_seen += 1;

            candidates.extend(
                ctx.scan_numbers(text, start, end)
                    .iter()
                    .filter(|token| ctx.admissible(text, token))
                    .map(|token| candidate_from_token(window, ctx, token, self.method())),
            );
        }

        debug!(
            "NextLinesStrategy: identifier={} lines_scanned={} candidates={}",
            window.identifier,
            lines_seen,
            candidates.len()
        );
        candidates
    }
}

impl Default for NextLinesStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pipeline::processing::locator::IdentifierLocator;
    use rust_decimal::Decimal;

    fn values_for(text: &str, config: &EngineConfig) -> Vec<Decimal> {
        let window = &IdentifierLocator::default().locate(text)[0];
        let ctx = ScanContext::from_config(config);
        NextLinesStrategy::new()
            .extract(window, &ctx)
            .into_iter()
            .map(|c| c.value)
            .collect()
    }

    #[test]
    fn test_next_lines_reads_following_lines_within_limit() {
        let text = "XS1234567890 ACME NOTES\n\nNominal 200'000\nValue 199'080\nExtra 1'111\nLate 2'222";
        let config = EngineConfig {
            next_lines_count: 3,
            ..EngineConfig::default()
        };
        assert_eq!(
            values_for(text, &config),
            vec![Decimal::from(200_000), Decimal::from(199_080), Decimal::from(1_111)]
        );
    }

    #[test]
    fn test_next_lines_stops_at_next_identifier() {
        let text = "XS1234567890 ACME NOTES\nValue 50'000\nUS0378331005 APPLE\nValue 75'000";
        assert_eq!(values_for(text, &EngineConfig::default()), vec![Decimal::from(50_000)]);
    }

    #[test]
    fn test_next_lines_empty_when_identifier_on_last_line() {
        let text = "header 1'000\nXS1234567890 ACME";
        assert!(values_for(text, &EngineConfig::default()).is_empty());
    }
}
