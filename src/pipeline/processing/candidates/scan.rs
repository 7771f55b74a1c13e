//! Number-token scanning and feature extraction shared by all strategies.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::trace;

use crate::config::EngineConfig;
use crate::constants::{CURRENCY_SYMBOLS, PORTFOLIO_TOTAL_LABELS, SUBTOTAL_LABELS};
use crate::domain::{CandidateFeatures, ContextWindow};
use crate::pipeline::processing::locator::identifier_spans;
use crate::pipeline::processing::numeric::{parse_literal, NumberStyle, NumericLiteral};

/// Grouped numbers first so `1'234'567` is not split into `1` and `234`
pub const NUMBER_PATTERN: &str = r"\d{1,3}(?:['’,]\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?";

static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(NUMBER_PATTERN).unwrap());

/// Characters that glue a number into a larger structure (dates, times, decimals)
const JOINERS: &[char] = &['.', ',', '\'', '’', '/', '-', ':'];

const MINUS_SIGNS: &[char] = &['-', '−'];

/// Tokens inspected for the softer "exclusion on the same line" feature
const SOFT_EXCLUSION_BEFORE: usize = 6;
const SOFT_EXCLUSION_AFTER: usize = 3;
/// Tokens inspected on each side for a currency code
const CURRENCY_TOKEN_RADIUS: usize = 2;
/// Characters before a number searched for a value label
const LABEL_LOOKBACK_CHARS: usize = 60;

/// A validated number occurrence inside a window's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberToken {
    /// Window-relative byte offsets
    pub start: usize,
    pub end: usize,
    pub raw: String,
    pub literal: NumericLiteral,
    /// Followed by a `%` sign
    pub percent: bool,
    /// Signed with a leading or trailing minus, or wrapped in accounting parentheses.
    /// `literal.value` carries the sign.
    pub negative: bool,
}

/// Vocabulary and limits compiled once from the engine config
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub currencies: Vec<String>,
    pub value_labels: Vec<String>,
    pub exclusion_labels: Vec<String>,
    pub exclusion_token_radius: usize,
    pub exclusion_token_radius_after: usize,
    pub next_lines_count: usize,
    pub aggressive_min: Decimal,
    pub aggressive_max: Decimal,
}

impl ScanContext {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            currencies: config.currencies.iter().map(|c| c.to_uppercase()).collect(),
            value_labels: config.value_labels.iter().map(|l| l.to_lowercase()).collect(),
            exclusion_labels: config.exclusion_labels.iter().map(|l| l.to_lowercase()).collect(),
            exclusion_token_radius: config.exclusion_token_radius,
            exclusion_token_radius_after: config.exclusion_token_radius_after,
            next_lines_count: config.next_lines_count,
            aggressive_min: config.aggressive_min,
            aggressive_max: config.aggressive_max,
        }
    }

    /// Every well-formed number in `text[from..to]`, in order
    pub fn scan_numbers(&self, text: &str, from: usize, to: usize) -> Vec<NumberToken> {
        NUMBER_TOKEN
            .find_iter(&text[from..to])
            .filter_map(|m| self.token_at(text, from + m.start(), from + m.end()))
            .collect()
    }

    /// Validate the boundaries of a numeric match and parse it.
    ///
    /// Rejects digits embedded in words or identifiers, pieces of dates and
    /// times, and literals the normalizer cannot read.
    pub fn token_at(&self, text: &str, start: usize, end: usize) -> Option<NumberToken> {
        let before = &text[..start];
        let after = &text[end..];

        let mut prev = before.chars().rev();
        match prev.next() {
            Some(c) if c.is_alphanumeric() && !self.glued_currency_before(before) => return None,
            Some(c) if JOINERS.contains(&c) && prev.next().map_or(false, |p| p.is_ascii_digit()) => {
                return None
            }
            _ => {}
        }

        let mut next = after.chars();
        match next.next() {
            Some(c) if c.is_alphanumeric() && !self.glued_currency_after(after) => return None,
            Some(c) if JOINERS.contains(&c) && next.next().map_or(false, |n| n.is_ascii_digit()) => {
                return None
            }
            _ => {}
        }

        let raw = &text[start..end];
        let Some(mut literal) = parse_literal(raw) else {
            trace!("discarding malformed numeric literal {:?}", raw);
            return None;
        };
        let percent = after.trim_start_matches([' ', '\t']).starts_with('%');
        let negative = before.ends_with(MINUS_SIGNS)
            || after.starts_with(MINUS_SIGNS)
            || (before.ends_with('(') && after.trim_start_matches([' ', '\t']).starts_with(')'));
        if negative {
            literal.value = -literal.value;
        }

        Some(NumberToken {
            start,
            end,
            raw: raw.to_string(),
            literal,
            percent,
            negative,
        })
    }

    /// Monetary candidates exclude percentages, negatives, figures on total or
    /// subtotal lines and numbers sitting next to an exclusionary label
    pub fn admissible(&self, text: &str, token: &NumberToken) -> bool {
        if token.percent || token.negative || token.literal.value.is_sign_negative() {
            return false;
        }
        let (line_start, line_end) = line_bounds(text, token.start);
        if is_summary_line(&text[line_start..line_end]) {
            trace!("rejecting {} on a total line", token.raw);
            return false;
        }
        let before = tokens_before(&text[line_start..token.start], self.exclusion_token_radius);
        let after = tokens_after(&text[token.end..line_end], self.exclusion_token_radius_after);
        let excluded = before.iter().chain(after.iter()).any(|t| self.is_exclusion_label(t));
        if excluded {
            trace!("rejecting {} next to an exclusionary label", token.raw);
        }
        !excluded
    }

    /// Contextual cues for the scorer
    pub fn features_for(&self, window: &ContextWindow, token: &NumberToken) -> CandidateFeatures {
        let text = window.text.as_str();
        let (line_start, line_end) = line_bounds(text, token.start);
        let prefix = &text[line_start..token.start];
        let suffix = &text[token.end..line_end];

        let lookback: String = {
            let chars: Vec<char> = prefix.chars().collect();
            let from = chars.len().saturating_sub(LABEL_LOOKBACK_CHARS);
            chars[from..].iter().collect::<String>().to_lowercase()
        };
        let value_label_nearby = self.value_labels.iter().any(|label| lookback.contains(label.as_str()));

        let currency_nearby = tokens_before(prefix, CURRENCY_TOKEN_RADIUS)
            .iter()
            .chain(tokens_after(suffix, CURRENCY_TOKEN_RADIUS).iter())
            .any(|t| self.is_currency_token(t))
            || self.glued_currency_before(prefix)
            || self.glued_currency_after(suffix);

        let exclusion_nearby = tokens_before(prefix, SOFT_EXCLUSION_BEFORE)
            .iter()
            .chain(tokens_after(suffix, SOFT_EXCLUSION_AFTER).iter())
            .any(|t| self.is_exclusion_label(t));

        let identifier_at = window.local_identifier_offset();
        let crosses_identifier = identifier_spans(text).into_iter().any(|(start, _)| {
            start != identifier_at
                && ((identifier_at < start && start < token.start) || (token.start < start && start < identifier_at))
        });

        CandidateFeatures {
            value_label_nearby,
            currency_nearby,
            exclusion_nearby,
            short_digit_run: token.literal.integer_digits < 4,
            reference_like: token.literal.style == NumberStyle::Plain
                && token.literal.integer_digits >= 7
                && token.literal.value.fract().is_zero(),
            crosses_identifier,
        }
    }

    pub fn is_exclusion_label(&self, token: &str) -> bool {
        let cleaned = clean_token(token).to_lowercase();
        !cleaned.is_empty() && self.exclusion_labels.iter().any(|l| *l == cleaned)
    }

    pub fn is_currency_token(&self, token: &str) -> bool {
        if CURRENCY_SYMBOLS.iter().any(|(symbol, code)| token.contains(symbol) && self.allows(code)) {
            return true;
        }
        let cleaned = clean_token(token).to_uppercase();
        self.allows(&cleaned)
    }

    /// Allow-listed code nearest to `pos` on its line, preferring what follows
    pub fn currency_on_line(&self, text: &str, pos: usize) -> Option<String> {
        let (line_start, line_end) = line_bounds(text, pos);
        let after = text[pos..line_end].split_whitespace();
        let before = text[line_start..pos].split_whitespace().rev();
        after.chain(before).find_map(|t| self.currency_code_of(t))
    }

    /// The allow-listed code a token denotes, if any
    pub fn currency_code_of(&self, token: &str) -> Option<String> {
        for (symbol, code) in CURRENCY_SYMBOLS {
            if token.contains(symbol) && self.allows(code) {
                return Some(code.to_string());
            }
        }
        let cleaned = clean_token(token).to_uppercase();
        if self.allows(&cleaned) {
            return Some(cleaned);
        }
        // glued forms such as "CHF199'080" or "199'080CHF"
        let letters: String = token.chars().filter(|c| c.is_ascii_uppercase()).collect();
        if letters.len() == 3 && token.chars().any(|c| c.is_ascii_digit()) && self.allows(&letters) {
            return Some(letters);
        }
        None
    }

    fn allows(&self, code: &str) -> bool {
        self.currencies.iter().any(|c| c == code)
    }

    fn glued_currency_before(&self, before: &str) -> bool {
        let tail: Vec<char> = before.chars().rev().take(4).collect();
        if tail.len() < 3 || !tail[..3].iter().all(|c| c.is_ascii_uppercase()) {
            return false;
        }
        if tail.get(3).map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }
        let code: String = tail[..3].iter().rev().collect();
        self.allows(&code)
    }

    fn glued_currency_after(&self, after: &str) -> bool {
        let head: Vec<char> = after.chars().take(4).collect();
        if head.len() < 3 || !head[..3].iter().all(|c| c.is_ascii_uppercase()) {
            return false;
        }
        if head.get(3).map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }
        let code: String = head[..3].iter().collect();
        self.allows(&code)
    }
}

/// Byte range of the line containing `pos`
pub fn line_bounds(text: &str, pos: usize) -> (usize, usize) {
    let start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[pos..].find('\n').map(|i| pos + i).unwrap_or(text.len());
    (start, end)
}

/// Window-relative byte range that belongs to the window's own record.
///
/// Numbers between an earlier identifier and this one belong to the earlier
/// record: the range starts at this identifier when the earlier one shares its
/// line, else at the start of its line. A later identifier ends the range at
/// its own start when it shares the line, else at the start of its line.
pub fn record_span(window: &ContextWindow) -> (usize, usize) {
    let text = window.text.as_str();
    let own = window.local_identifier_offset();
    let (own_line_start, own_line_end) = window.identifier_line_span();
    let (mut start, mut end) = (0, text.len());

    for (other_start, _) in identifier_spans(text) {
        if other_start == own {
            continue;
        }
        if other_start < own {
            let bound = if other_start >= own_line_start {
                own
            } else {
                own_line_start
            };
            start = start.max(bound);
        } else {
            let bound = if other_start < own_line_end {
                other_start
            } else {
                line_bounds(text, other_start).0
            };
            end = end.min(bound);
        }
    }
    (start, end.max(start))
}

/// A line reporting a portfolio total or a subtotal
fn is_summary_line(line: &str) -> bool {
    let normalized = line.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    PORTFOLIO_TOTAL_LABELS
        .iter()
        .chain(SUBTOTAL_LABELS.iter())
        .any(|label| normalized.contains(label))
}

fn tokens_before(segment: &str, count: usize) -> Vec<&str> {
    let mut tokens: Vec<&str> = segment.split_whitespace().rev().take(count).collect();
    tokens.reverse();
    tokens
}

fn tokens_after(segment: &str, count: usize) -> Vec<&str> {
    segment.split_whitespace().take(count).collect()
}

fn clean_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ctx() -> ScanContext {
        ScanContext::from_config(&EngineConfig::default())
    }

    fn values(tokens: &[NumberToken]) -> Vec<Decimal> {
        tokens.iter().map(|t| t.literal.value).collect()
    }

    fn window(text: &str, identifier: &str) -> ContextWindow {
        ContextWindow {
            identifier: identifier.to_string(),
            start_offset: 0,
            end_offset: text.len(),
            identifier_offset: text.find(identifier).unwrap(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_scan_skips_identifier_digits_dates_and_times() {
        let text = "XS1234567890 as of 31.12.2024 10:30 value 199'080";
        let ctx = ctx();
        let tokens = ctx.scan_numbers(text, 0, text.len());
        assert_eq!(values(&tokens), vec![Decimal::from(199_080)]);
    }

    #[test]
    fn test_scan_flags_percentages() {
        let text = "coupon 4.25 % price 101.5%";
        let ctx = ctx();
        let tokens = ctx.scan_numbers(text, 0, text.len());
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.percent));
    }

    #[test]
    fn test_scan_accepts_glued_currency_codes() {
        let text = "CHF199'080 and 5'000USD";
        let ctx = ctx();
        let tokens = ctx.scan_numbers(text, 0, text.len());
        assert_eq!(values(&tokens), vec![Decimal::from(199_080), Decimal::from(5_000)]);
    }

    #[test]
    fn test_exclusion_label_rejects_adjacent_number() {
        let text = "Valor 1234567 accrued 90 days amount 25'000";
        let ctx = ctx();
        let tokens = ctx.scan_numbers(text, 0, text.len());
        let admitted: Vec<Decimal> = tokens
            .iter()
            .filter(|t| ctx.admissible(text, t))
            .map(|t| t.literal.value)
            .collect();
        assert_eq!(admitted, vec![Decimal::from(25_000)]);
    }

    #[test]
    fn test_features_for_labeled_currency_value() {
        let text = "ACME 5% NOTES XS1234567890 Market value USD 1'250'000";
        let ctx = ctx();
        let w = window(text, "XS1234567890");
        let token = ctx
            .scan_numbers(text, 0, text.len())
            .into_iter()
            .find(|t| t.literal.value == Decimal::from_str("1250000").unwrap())
            .unwrap();

        let features = ctx.features_for(&w, &token);
        assert!(features.value_label_nearby);
        assert!(features.currency_nearby);
        assert!(!features.short_digit_run);
        assert!(!features.crosses_identifier);
    }

    #[test]
    fn test_features_detect_foreign_identifier_between() {
        let text = "XS1234567890 ACME\nUS0378331005 APPLE 75'000";
        let ctx = ctx();
        let w = window(text, "XS1234567890");
        let token = ctx.scan_numbers(text, 0, text.len()).pop().unwrap();
        assert!(ctx.features_for(&w, &token).crosses_identifier);
    }

    #[test]
    fn test_signed_and_bracketed_numbers_are_negative() {
        let text = "USD -50'000 and (12'500) and 7'000- and −3'000 and 9'000";
        let ctx = ctx();
        let tokens = ctx.scan_numbers(text, 0, text.len());
        assert_eq!(
            values(&tokens),
            vec![
                Decimal::from(-50_000),
                Decimal::from(-12_500),
                Decimal::from(-7_000),
                Decimal::from(-3_000),
                Decimal::from(9_000)
            ]
        );
        let admitted: Vec<&NumberToken> = tokens.iter().filter(|t| ctx.admissible(text, t)).collect();
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].literal.value, Decimal::from(9_000));
    }

    #[test]
    fn test_total_and_subtotal_lines_are_not_admissible() {
        let text = "BETA XS1234567890 USD 200'000\nTotal   Assets USD 300'000\nSub-total 500'000";
        let ctx = ctx();
        let admitted: Vec<Decimal> = ctx
            .scan_numbers(text, 0, text.len())
            .iter()
            .filter(|t| ctx.admissible(text, t))
            .map(|t| t.literal.value)
            .collect();
        assert_eq!(admitted, vec![Decimal::from(200_000)]);
    }

    #[test]
    fn test_trailing_exclusion_radius_follows_config() {
        let text = "XS1234567890 12'000 days";
        let token = ctx().scan_numbers(text, 0, text.len()).pop().unwrap();
        assert!(!ctx().admissible(text, &token));

        let relaxed = ScanContext::from_config(&EngineConfig {
            exclusion_token_radius_after: 0,
            ..EngineConfig::default()
        });
        assert!(relaxed.admissible(text, &token));
    }

    #[test]
    fn test_record_span_stops_at_neighbouring_records() {
        let text = "ALPHA XS1234567890 USD 100'000\nBETA US0378331005 USD 20'000\nGAMMA CH0012032048 USD 300'000";
        let (start, end) = record_span(&window(text, "US0378331005"));
        assert_eq!(&text[start..end], "BETA US0378331005 USD 20'000\n");

        let (start, end) = record_span(&window(text, "XS1234567890"));
        assert_eq!(start, 0);
        assert_eq!(&text[start..end], "ALPHA XS1234567890 USD 100'000\n");
    }

    #[test]
    fn test_record_span_splits_a_shared_line() {
        let text = "XS1234567890 10'000 US0378331005 20'000";
        let (start, end) = record_span(&window(text, "XS1234567890"));
        assert_eq!(&text[start..end], "XS1234567890 10'000 ");
        let (start, end) = record_span(&window(text, "US0378331005"));
        assert_eq!(&text[start..end], "US0378331005 20'000");
    }

    #[test]
    fn test_currency_on_line_prefers_following_code() {
        let text = "EUR bucket XS1234567890 CHF 1'000";
        let ctx = ctx();
        let pos = text.find("XS").unwrap();
        assert_eq!(ctx.currency_on_line(text, pos).as_deref(), Some("CHF"));
        assert_eq!(ctx.currency_on_line("no code XS1234567890 here", 8), None);
    }
}
