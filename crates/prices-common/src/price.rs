//! Canonical fixed-point price parsing
//!
//! Prices are stored and compared as integer cents plus a canonical decimal
//! string with exactly two fraction digits. The canonical text is always
//! regenerated from the cents value, never taken from the input, so `"5"`,
//! `"5.0"` and `"5.00"` all canonicalize to the same representation.

use thiserror::Error;

/// A price in canonical form: integer cents and the two-fraction-digit text
/// derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPrice {
    /// Price in cents, always positive.
    pub cents: i64,
    /// Canonical decimal string, `"{whole}.{frac:02}"`.
    pub text: String,
}

/// Errors produced by [`canonicalize`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PriceParseError {
    #[error("price is empty")]
    Empty,

    #[error("price must use '.' as the decimal separator")]
    CommaSeparator,

    #[error("price has more than two fractional digits")]
    TooManyFractionDigits,

    #[error("price is not a valid decimal number: {0}")]
    Malformed(String),

    #[error("price must be greater than zero")]
    NonPositive,
}

/// Parse a price string into canonical cents form.
///
/// Accepted grammar: decimal digits, optionally followed by a single `.` and
/// one or two fraction digits. A bare leading `.` is read as `0.`. A single
/// fraction digit is right-padded with a zero. Commas are rejected outright
/// rather than reinterpreted as decimal separators.
pub fn canonicalize(text: &str) -> Result<CanonicalPrice, PriceParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PriceParseError::Empty);
    }
    if text.contains(',') {
        return Err(PriceParseError::CommaSeparator);
    }

    let normalized = if text.starts_with('.') {
        format!("0{}", text)
    } else {
        text.to_string()
    };

    let mut parts = normalized.splitn(3, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next();
    if parts.next().is_some() {
        return Err(PriceParseError::Malformed(text.to_string()));
    }

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceParseError::Malformed(text.to_string()));
    }

    let frac_cents: i64 = match frac {
        None => 0,
        Some("") => return Err(PriceParseError::Malformed(text.to_string())),
        Some(f) if f.len() > 2 => return Err(PriceParseError::TooManyFractionDigits),
        Some(f) => {
            if !f.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PriceParseError::Malformed(text.to_string()));
            }
            let digits: i64 = f
                .parse()
                .map_err(|_| PriceParseError::Malformed(text.to_string()))?;
            // One fraction digit means tenths, pad to cents.
            if f.len() == 1 {
                digits * 10
            } else {
                digits
            }
        },
    };

    let whole_value: i64 = whole
        .parse()
        .map_err(|_| PriceParseError::Malformed(text.to_string()))?;

    let cents = whole_value
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac_cents))
        .ok_or_else(|| PriceParseError::Malformed(text.to_string()))?;

    if cents <= 0 {
        return Err(PriceParseError::NonPositive);
    }

    Ok(CanonicalPrice {
        cents,
        text: format_cents(cents),
    })
}

/// Render integer cents as the canonical two-fraction-digit decimal string.
pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}
