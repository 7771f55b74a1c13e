//! Locale-aware numeric literal normalization.
//!
//! Statement text groups thousands with apostrophes (`1'234'567`), commas
//! (`1,234,567`) or nothing at all, and may wrap the figure in currency
//! symbols, codes or a percentage suffix. Everything here is pure.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::CURRENCY_SYMBOLS;

static APOSTROPHE_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(?:['’]\d{3})+(?:\.\d+)?$").unwrap());
static COMMA_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(?:,\d{3})+(?:\.\d+)?$").unwrap());
static PLAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// Thousands-grouping convention of a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberStyle {
    Plain,
    Apostrophe,
    Comma,
}

impl NumberStyle {
    pub const ALL: [NumberStyle; 3] = [NumberStyle::Plain, NumberStyle::Apostrophe, NumberStyle::Comma];

    fn separator(&self) -> Option<char> {
        match self {
            NumberStyle::Plain => None,
            NumberStyle::Apostrophe => Some('\''),
            NumberStyle::Comma => Some(','),
        }
    }
}

/// A parsed literal together with the shape it was written in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericLiteral {
    pub value: Decimal,
    pub percent: bool,
    pub style: NumberStyle,
    pub integer_digits: usize,
}

/// Canonical decimal value of a literal, or `None` when it is not a number.
///
/// `None` means "no value" and must never be read as zero.
pub fn normalize(text: &str) -> Option<Decimal> {
    parse_literal(text).map(|literal| literal.value)
}

/// Parse a literal, keeping percentage and grouping metadata
pub fn parse_literal(text: &str) -> Option<NumericLiteral> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut body = strip_currency(&compact);

    let percent = body.ends_with('%');
    if percent {
        body = &body[..body.len() - 1];
    }

    let negative = body.starts_with('-');
    if negative {
        body = &body[1..];
    }

    let style = if APOSTROPHE_GROUPED.is_match(body) {
        NumberStyle::Apostrophe
    } else if COMMA_GROUPED.is_match(body) {
        NumberStyle::Comma
    } else if PLAIN.is_match(body) {
        NumberStyle::Plain
    } else {
        return None;
    };

    let canonical: String = body.chars().filter(|c| !matches!(c, '\'' | '’' | ',')).collect();
    let integer_digits = canonical.split('.').next().map(str::len).unwrap_or(0);
    let mut value = Decimal::from_str(&canonical).ok()?.normalize();
    if negative {
        value = -value;
    }

    Some(NumericLiteral {
        value,
        percent,
        style,
        integer_digits,
    })
}

/// Render a decimal in the given grouping style; `normalize` reads it back unchanged
pub fn format_grouped(value: Decimal, style: NumberStyle) -> String {
    let plain = value.normalize().to_string();
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let grouped = match style.separator() {
        None => integer.to_string(),
        Some(sep) => {
            let mut out = String::with_capacity(integer.len() + integer.len() / 3);
            for (i, ch) in integer.chars().enumerate() {
                if i > 0 && (integer.len() - i) % 3 == 0 {
                    out.push(sep);
                }
                out.push(ch);
            }
            out
        }
    };

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

fn strip_currency(text: &str) -> &str {
    let mut body = text;
    for (symbol, _) in CURRENCY_SYMBOLS {
        body = body.trim_start_matches(symbol).trim_end_matches(symbol);
    }
    body = strip_code_prefix(body);
    strip_code_suffix(body)
}

fn strip_code_prefix(text: &str) -> &str {
    let letters = text.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters == 3 {
        &text[3..]
    } else {
        text
    }
}

fn strip_code_suffix(text: &str) -> &str {
    let letters = text.chars().rev().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters == 3 {
        &text[..text.len() - 3]
    } else {
        text
    }
}
