use crate::error::parser_error;
use crate::parser::Rule;
use crate::Result;
use pest::iterators::Pair;

// Integer literals are signed decimal or 0x-prefixed hex. They are parsed
// into i128 so that both -2^63 and 2^64-1 survive; each consumer applies
// its own range check.

pub(crate) const WORD_MIN: i128 = -(1i128 << 63);
pub(crate) const WORD_MAX: i128 = (1i128 << 64) - 1;

pub(crate) fn parse_int(pair: &Pair<Rule>) -> Result<i128> {
    let text = pair.as_str();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse(),
    };

    let value = magnitude
        .ok()
        .map(|m: i128| if negative { -m } else { m })
        .filter(|v| (WORD_MIN..=WORD_MAX).contains(v))
        .ok_or_else(|| {
            parser_error(
                pair.as_span(),
                format!("integer literal {} does not fit in 64 bits", text),
            )
        })?;

    Ok(value)
}

pub(crate) fn parse_uint(pair: &Pair<Rule>) -> Result<u64> {
    let value = parse_int(pair)?;
    if (0..=WORD_MAX).contains(&value) {
        Ok(value as u64)
    } else {
        Err(parser_error(
            pair.as_span(),
            format!("expected an unsigned value, found {}", pair.as_str()),
        ))
    }
}

pub(crate) fn parse_float(pair: &Pair<Rule>) -> Result<f64> {
    pair.as_str().parse().map_err(|_| {
        parser_error(
            pair.as_span(),
            format!("malformed float literal {}", pair.as_str()),
        )
    })
}

/// Resolves the standard escapes of a double-quoted string body.
pub(crate) fn unescape(inner: &str) -> String {
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some('r') => text.push('\r'),
            Some('0') => text.push('\0'),
            Some(other) => text.push(other),
            None => break,
        }
    }

    text
}
