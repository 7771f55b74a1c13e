use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{Candidate, ContextWindow, ExtractionMethod};
use crate::pipeline::processing::candidates::scan::NUMBER_PATTERN;
use crate::pipeline::processing::candidates::{candidate_from_token, record_span, ExtractionStrategy, ScanContext};

/// Which pattern family matched a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    Label,
    Currency,
}

/// Numbers adjacent to value labels ("market value: 1'000") or to currency
/// tokens in either order ("USD 1'000", "1'000 USD")
pub struct LabeledPatternStrategy {
    patterns: Vec<(Regex, Cue)>,
}

impl LabeledPatternStrategy {
    pub fn new(ctx: &ScanContext) -> Self {
        let mut patterns = Vec::new();

        let mut labels: Vec<&str> = ctx.value_labels.iter().map(String::as_str).collect();
        // longest first so "market value" wins over "value"
        labels.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let labels: Vec<String> = labels
            .iter()
            .map(|l| regex::escape(l).replace(' ', r"\s+"))
            .collect();
        if !labels.is_empty() {
            let source = format!(r"(?i)\b(?:{})\b[^\d\n]{{0,24}}?({})", labels.join("|"), NUMBER_PATTERN);
            if let Ok(re) = Regex::new(&source) {
                patterns.push((re, Cue::Label));
            }
        }

        let codes: Vec<String> = ctx.currencies.iter().map(|c| regex::escape(c)).collect();
        if !codes.is_empty() {
            let codes = codes.join("|");
            let after = format!(r"({})[ \t]?(?:{})\b", NUMBER_PATTERN, codes);
            let before = format!(r"(?:\b(?:{})|[$€£¥])[ \t]?({})", codes, NUMBER_PATTERN);
            for source in [after, before] {
                if let Ok(re) = Regex::new(&source) {
                    patterns.push((re, Cue::Currency));
                }
            }
        }

        Self { patterns }
    }
}

impl ExtractionStrategy for LabeledPatternStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::LabeledPattern
    }

    fn name(&self) -> &str {
        "Labeled-pattern scan"
    }

    fn extract(&self, window: &ContextWindow, ctx: &ScanContext) -> Vec<Candidate> {
        let text = window.text.as_str();
        let (span_start, span_end) = record_span(window);
        let mut by_offset: BTreeMap<usize, Candidate> = BTreeMap::new();

        for (pattern, cue) in &self.patterns {
            for caps in pattern.captures_iter(text) {
                let Some(number) = caps.get(1) else { continue };
                if number.start() < span_start || number.start() >= span_end {
                    continue;
                }
                let Some(token) = ctx.token_at(text, number.start(), number.end()) else {
                    continue;
                };
                if !ctx.admissible(text, &token) {
                    continue;
                }

                let candidate = by_offset
                    .entry(token.start)
                    .or_insert_with(|| candidate_from_token(window, ctx, &token, self.method()));
                match cue {
                    Cue::Label => candidate.features.value_label_nearby = true,
                    Cue::Currency => candidate.features.currency_nearby = true,
                }
            }
        }

        debug!(
            "LabeledPatternStrategy: identifier={} candidates={}",
            window.identifier,
            by_offset.len()
        );
        by_offset.into_values().collect()
    }
}
