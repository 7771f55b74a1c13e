//! Identifier location and context-window extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::ContextWindow;

/// Two uppercase letters, nine uppercase letters/digits, one check digit.
/// Structural only; the check digit is verified separately.
pub static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2}[A-Z0-9]{9}[0-9]\b").unwrap());

pub const DEFAULT_CONTEXT_RADIUS: usize = 500;

/// Scans raw text for identifiers and cuts a window around each occurrence
#[derive(Debug, Clone)]
pub struct IdentifierLocator {
    radius: usize,
}

impl IdentifierLocator {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// One window per raw match, in ascending document order. Repeated
    /// identifiers are kept; merging them is an assembly decision.
    /// A window edge that falls inside a number is widened to include all of it.
    pub fn locate(&self, text: &str) -> Vec<ContextWindow> {
        let windows: Vec<ContextWindow> = IDENTIFIER_PATTERN
            .find_iter(text)
            .map(|m| {
                let start = floor_char_boundary(text, m.start().saturating_sub(self.radius));
                let end = ceil_char_boundary(text, (m.end() + self.radius).min(text.len()));
                let (start, end) = (widen_start(text, start), widen_end(text, end));
                ContextWindow {
                    identifier: m.as_str().to_string(),
                    start_offset: start,
                    end_offset: end,
                    identifier_offset: m.start(),
                    text: text[start..end].to_string(),
                }
            })
            .collect();

        debug!("IdentifierLocator: located {} identifier occurrences", windows.len());
        windows
    }
}

impl Default for IdentifierLocator {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_RADIUS)
    }
}

/// Byte spans of every identifier in `text`
pub fn identifier_spans(text: &str) -> Vec<(usize, usize)> {
    IDENTIFIER_PATTERN
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// ISIN check-digit validation: letters expand to two digits (A=10 .. Z=35)
/// and the resulting digit string must pass the Luhn check.
pub fn isin_checksum_valid(identifier: &str) -> bool {
    if !IDENTIFIER_PATTERN.is_match(identifier) || identifier.len() != 12 {
        return false;
    }

    let mut digits: Vec<u32> = Vec::with_capacity(24);
    for ch in identifier.chars() {
        match ch {
            '0'..='9' => digits.push(ch as u32 - '0' as u32),
            'A'..='Z' => {
                let n = ch as u32 - 'A' as u32 + 10;
                digits.push(n / 10);
                digits.push(n % 10);
            }
            _ => return false,
        }
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '\'' | '’' | ',' | '.')
}

/// True when `index` splits a run of number characters holding a digit on either side
fn cuts_number(text: &str, index: usize) -> bool {
    match (text[..index].chars().next_back(), text[index..].chars().next()) {
        (Some(before), Some(after)) => {
            is_number_char(before) && is_number_char(after) && (before.is_ascii_digit() || after.is_ascii_digit())
        }
        _ => false,
    }
}

fn widen_start(text: &str, mut start: usize) -> usize {
    if !cuts_number(text, start) {
        return start;
    }
    while let Some(c) = text[..start].chars().next_back().filter(|c| is_number_char(*c)) {
        start -= c.len_utf8();
    }
    start
}

fn widen_end(text: &str, mut end: usize) -> usize {
    if !cuts_number(text, end) {
        return end;
    }
    while let Some(c) = text[end..].chars().next().filter(|c| is_number_char(*c)) {
        end += c.len_utf8();
    }
    end
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
