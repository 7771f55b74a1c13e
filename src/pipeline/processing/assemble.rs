//! Record assembly: turning a selected candidate into a [`SecurityRecord`]
//! and folding repeated identifiers together.

use std::collections::HashMap;

use tracing::debug;

use crate::config::EngineConfig;
use crate::constants::{CATEGORY_KEYWORDS, CATEGORY_OTHER, IDENTIFIER_LABELS};
use crate::domain::{
    Candidate, ContextWindow, Decision, DecisionEntry, DuplicatePolicy, SecurityRecord,
};
use crate::observability::metrics;
use crate::pipeline::processing::candidates::ScanContext;
use crate::pipeline::processing::locator::IDENTIFIER_PATTERN;

/// Names with fewer letters than this fall back to the previous line
const MIN_NAME_LETTERS: usize = 3;

/// Resolves name, currency and category around a chosen value
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    ctx: ScanContext,
    default_currency: String,
}

impl RecordBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ctx: ScanContext::from_config(config),
            default_currency: config.default_currency.to_uppercase(),
        }
    }

    pub fn build(&self, window: &ContextWindow, chosen: Candidate) -> SecurityRecord {
        let name = resolve_name(window);
        let (currency, currency_inferred) = match self.resolve_currency(window) {
            Some(code) => (code, false),
            None => (self.default_currency.clone(), true),
        };
        let category = classify(&name).to_string();

        debug!(
            "RecordBuilder: identifier={} name={:?} currency={} inferred={} category={}",
            window.identifier, name, currency, currency_inferred, category
        );

        SecurityRecord {
            identifier: window.identifier.clone(),
            name,
            value: chosen.value,
            currency,
            currency_inferred,
            category,
            confidence: chosen.confidence,
            method: chosen.method,
            correction_applied: false,
            correction_reason: None,
            conflict: false,
        }
    }

    /// Identifier line first, then the lines the following-lines scan would read
    fn resolve_currency(&self, window: &ContextWindow) -> Option<String> {
        let text = window.text.as_str();
        if let Some(code) = self.ctx.currency_on_line(text, window.local_identifier_offset()) {
            return Some(code);
        }

        let (_, mut cursor) = window.identifier_line_span();
        let mut lines_seen = 0;
        while lines_seen < self.ctx.next_lines_count && cursor < text.len() {
            let start = cursor + 1;
            let end = text[start..].find('\n').map(|i| start + i).unwrap_or(text.len());
            cursor = end;
            let line = &text[start..end];
            if line.trim().is_empty() {
                continue;
            }
            if IDENTIFIER_PATTERN.is_match(line) {
                break;
            }
            lines_seen += 1;
            if let Some(code) = self.ctx.currency_on_line(text, start) {
                return Some(code);
            }
        }
        None
    }
}

/// Text before the identifier on its line, or the previous non-empty line
/// when that leaves too little to be a name
pub fn resolve_name(window: &ContextWindow) -> String {
    let text = window.text.as_str();
    let (line_start, _) = window.identifier_line_span();
    let same_line = clean_name(&text[line_start..window.local_identifier_offset()]);
    if letter_count(&same_line) >= MIN_NAME_LETTERS {
        return same_line;
    }

    let previous = text[..line_start]
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .filter(|line| !IDENTIFIER_PATTERN.is_match(line))
        .map(clean_name)
        .unwrap_or_default();
    if letter_count(&previous) >= MIN_NAME_LETTERS {
        previous
    } else {
        same_line
    }
}

fn clean_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, ':' | ';' | ',' | '|' | '-' | '*' | '•')))
        .filter(|token| !token.is_empty())
        .filter(|token| !IDENTIFIER_LABELS.contains(&token.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn letter_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphabetic()).count()
}

/// First category whose keyword occurs in the lowercased name
pub fn classify(name: &str) -> &'static str {
    let haystack = format!(" {} ", name.to_lowercase());
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(CATEGORY_OTHER)
}

/// Folds records sharing an identifier according to the duplicate policy.
///
/// Output keeps the order in which identifiers first appeared.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator {
    policy: DuplicatePolicy,
}

impl Deduplicator {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn dedupe(&self, records: Vec<SecurityRecord>) -> (Vec<SecurityRecord>, Vec<DecisionEntry>) {
        let mut kept: Vec<SecurityRecord> = Vec::with_capacity(records.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut trail = Vec::new();

        for record in records {
            let Some(&slot) = index.get(&record.identifier) else {
                index.insert(record.identifier.clone(), kept.len());
                kept.push(record);
                continue;
            };
            let existing = &mut kept[slot];
            let entry = match self.policy {
                DuplicatePolicy::KeepHighestConfidence => keep_highest(existing, record, Decision::Merged),
                DuplicatePolicy::SumDuplicates => sum_into(existing, record),
                DuplicatePolicy::FlagConflict if existing.value == record.value => {
                    keep_highest(existing, record, Decision::Merged)
                }
                DuplicatePolicy::FlagConflict => {
                    existing.conflict = true;
                    metrics::assembly::conflict();
                    keep_highest(existing, record, Decision::Conflict)
                }
            };
            debug!(
                "Deduplicator: identifier={} policy={:?} decision={:?}",
                entry.identifier, self.policy, entry.decision
            );
            metrics::assembly::merged();
            trail.push(entry);
        }

        (kept, trail)
    }
}

/// Retain whichever record has the higher confidence; the first wins ties
fn keep_highest(existing: &mut SecurityRecord, incoming: SecurityRecord, decision: Decision) -> DecisionEntry {
    let conflict = existing.conflict;
    let dropped_value = if incoming.confidence > existing.confidence {
        let dropped = existing.value;
        *existing = incoming;
        existing.conflict = conflict;
        dropped
    } else {
        incoming.value
    };
    let reason = match decision {
        Decision::Conflict => "duplicate occurrence disagrees with the retained value",
        _ => "duplicate occurrence folded into the higher-confidence record",
    };
    DecisionEntry::new(&existing.identifier, decision)
        .with_values(Some(dropped_value), Some(existing.value))
        .with_reason(reason)
}

fn sum_into(existing: &mut SecurityRecord, incoming: SecurityRecord) -> DecisionEntry {
    let added = incoming.value;
    existing.value += incoming.value;
    existing.confidence = existing.confidence.min(incoming.confidence);
    if incoming.correction_applied {
        existing.correction_applied = true;
        existing.correction_reason = match (existing.correction_reason.take(), incoming.correction_reason) {
            (Some(a), Some(b)) if a != b => Some(format!("{}; {}", a, b)),
            (Some(a), _) => Some(a),
            (None, b) => b,
        };
    }
    DecisionEntry::new(&existing.identifier, Decision::Merged)
        .with_values(Some(added), Some(existing.value))
        .with_reason("duplicate occurrence summed into the first record")
}
